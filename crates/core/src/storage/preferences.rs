use crate::domain::schedule::ScheduleConfig;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEDULE_KEY: &str = "marketMorning_schedule";

/// Durable string map persisted as one JSON object file. Values are stored verbatim.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("preference file is not a JSON string map: {}", self.path.display()))
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        // A corrupt file is replaced rather than blocking every later save.
        let mut all = self.read_all().unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "discarding unreadable preference file");
            BTreeMap::new()
        });
        all.insert(key.to_string(), value);

        let body = serde_json::to_string_pretty(&all).context("serialize preferences failed")?;
        let tmp = self.path.with_extension("tmp");
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        std::fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Stored schedule, or the default one when nothing usable is stored.
pub fn load_schedule(store: &PreferenceStore) -> ScheduleConfig {
    let raw = match store.get(SCHEDULE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return ScheduleConfig::default(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read schedule preference; using default");
            return ScheduleConfig::default();
        }
    };

    match serde_json::from_str::<ScheduleConfig>(&raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(error = %err, "stored schedule is invalid; using default");
            ScheduleConfig::default()
        }
    }
}

pub fn save_schedule(store: &PreferenceStore, cfg: &ScheduleConfig) -> anyhow::Result<()> {
    cfg.validate()?;
    let raw = serde_json::to_string(cfg).context("serialize schedule failed")?;
    store.set(SCHEDULE_KEY, raw)?;
    tracing::info!(
        enabled = cfg.is_enabled,
        time = %cfg.time,
        days = cfg.days.len(),
        "schedule preference saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::DayToken;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        assert_eq!(load_schedule(&store), ScheduleConfig::default());
    }

    #[test]
    fn saved_schedule_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let cfg = ScheduleConfig::enabled("08:30", vec![DayToken::Mon, DayToken::Wed, DayToken::Fri])
            .unwrap();

        save_schedule(&PreferenceStore::new(&path), &cfg).unwrap();

        // Fresh store instance stands in for a restart.
        let reloaded = load_schedule(&PreferenceStore::new(&path));
        assert_eq!(reloaded, cfg);

        let raw = PreferenceStore::new(&path).get(SCHEDULE_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"isEnabled":true,"time":"08:30","days":["Mon","Wed","Fri"]}"#);
    }

    #[test]
    fn other_keys_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested/prefs.json"));
        store.set("other", "1".to_string()).unwrap();
        save_schedule(&store, &ScheduleConfig::default()).unwrap();
        assert_eq!(store.get("other").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn corrupt_value_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        store.set(SCHEDULE_KEY, "{not json".to_string()).unwrap();
        assert_eq!(load_schedule(&store), ScheduleConfig::default());
    }

    #[test]
    fn corrupt_file_is_replaced_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "garbage").unwrap();
        let store = PreferenceStore::new(&path);
        assert_eq!(load_schedule(&store), ScheduleConfig::default());

        let cfg = ScheduleConfig::enabled("07:00", vec![DayToken::Tue]).unwrap();
        save_schedule(&store, &cfg).unwrap();
        assert_eq!(load_schedule(&store), cfg);
    }

    #[test]
    fn invalid_schedule_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        let bad = ScheduleConfig {
            is_enabled: true,
            time: "25:00".to_string(),
            days: vec![],
        };
        assert!(save_schedule(&store, &bad).is_err());
        assert!(store.get(SCHEDULE_KEY).unwrap().is_none());
    }
}
