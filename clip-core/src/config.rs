//! # Configuration
//!
//! A minimal string key/value store. Components read typed values from a
//! [`ClipConfigSnapshot`] so the store itself never has to be shared.
//!
//! ```rust
//! use clip_core::ClipConfig;
//!
//! let mut config = ClipConfig::new();
//! config.set("upload.max_bytes", "1048576");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u64("upload.max_bytes"), Some(1_048_576));
//! ```
//!
//! ## Environment overrides
//!
//! [`ClipConfig::load_env`] copies every variable that starts with a prefix,
//! lower-casing it and turning `__` into `.`:
//!
//! ```bash
//! export VOICE__UPLOAD__MAX_BYTES=5000000   # -> upload.max_bytes
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct ClipConfig {
    values: HashMap<String, String>,
}

impl ClipConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when nothing is stored under it yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Load overrides from the process environment.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Load overrides from an explicit list of variables.
    ///
    /// `PREFIX__HTTP__PORT=8080` becomes `http.port = "8080"`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped
                    .trim_start_matches('_')
                    .to_lowercase()
                    .replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }

    pub fn snapshot(&self) -> ClipConfigSnapshot {
        ClipConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClipConfigSnapshot {
    map: HashMap<String, String>,
}

impl ClipConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_style_keys_are_normalized() {
        let mut config = ClipConfig::new();
        config.load_vars(
            "VOICE",
            vec![
                ("VOICE__UPLOAD__MAX_BYTES".to_string(), "42".to_string()),
                ("VOICE__HTTP__PORT".to_string(), "8080".to_string()),
                ("OTHER__HTTP__PORT".to_string(), "9999".to_string()),
            ],
        );

        let snapshot = config.snapshot();
        assert_eq!(snapshot.get_u64("upload.max_bytes"), Some(42));
        assert_eq!(snapshot.get("http.port"), Some("8080"));
        assert!(!config.has("other.http.port"));
    }

    #[test]
    fn set_default_does_not_override() {
        let mut config = ClipConfig::new();
        config.set("http.host", "0.0.0.0");
        config.set_default("http.host", "127.0.0.1");
        config.set_default("http.port", "3030");

        assert_eq!(config.get("http.host"), Some("0.0.0.0"));
        assert_eq!(config.get("http.port"), Some("3030"));
    }

    #[test]
    fn typed_getters_ignore_garbage() {
        let mut config = ClipConfig::new();
        config.set("upload.max_bytes", "lots");
        config.set("feature.enabled", "true");

        let snapshot = config.snapshot();
        assert_eq!(snapshot.get_u64("upload.max_bytes"), None);
        assert_eq!(snapshot.get_bool("feature.enabled"), Some(true));
        assert_eq!(snapshot.get_usize("missing"), None);
    }
}
