pub mod preferences;

pub use preferences::{load_schedule, save_schedule, PreferenceStore, SCHEDULE_KEY};
