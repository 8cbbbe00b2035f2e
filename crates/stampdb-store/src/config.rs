use serde::{Deserialize, Serialize};

/// Configuration for a [`Store`](crate::Store).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix for background thread names. Load workers are named
    /// `<prefix>-load`, save workers `<prefix>-save`.
    pub thread_name: String,
    /// When `true`, a load that dropped entries with unrecognized tags is
    /// reported at `warn` level instead of `debug`.
    pub warn_on_skipped: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            thread_name: "stampdb".into(),
            warn_on_skipped: true,
        }
    }
}

impl StoreConfig {
    pub(crate) fn load_thread_name(&self) -> String {
        format!("{}-load", self.thread_name)
    }

    pub(crate) fn save_thread_name(&self) -> String {
        format!("{}-save", self.thread_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.thread_name, "stampdb");
        assert!(c.warn_on_skipped);
        assert_eq!(c.load_thread_name(), "stampdb-load");
        assert_eq!(c.save_thread_name(), "stampdb-save");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c: StoreConfig = serde_json::from_str(r#"{"thread_name":"prefs"}"#).unwrap();
        assert_eq!(c.thread_name, "prefs");
        assert!(c.warn_on_skipped);
    }
}
