pub mod dashboard;
pub mod derive;
pub mod domain;
pub mod llm;
pub mod render;
pub mod session;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_PREFERENCES_PATH: &str = "market_morning.prefs.json";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub preferences_path: PathBuf,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            // API_KEY is what hosted builds inject; GEMINI_API_KEY wins when both are set.
            let gemini_api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|s| !s.trim().is_empty());

            let preferences_path = std::env::var("PREFERENCES_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PREFERENCES_PATH.to_string())
                .into();

            Ok(Self {
                gemini_api_key,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                preferences_path,
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY (or API_KEY) is required")
        }
    }

}
