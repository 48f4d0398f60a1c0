use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Where a backend put an upload. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageResult {
    /// Backend tag, `"default"` for the built-in asset store
    pub provider: String,
    /// URL or equivalent reference, if the backend exposes one
    pub locator: Option<String>,
    /// Opaque backend identifier (e.g. an attachment id)
    pub backend_id: Option<String>,
    /// Backend-specific fields, forwarded untouched
    pub raw: Map<String, Value>,
}

/// Provider assumed for handler mappings that do not name one.
pub const EXTERNAL_PROVIDER: &str = "external";

impl StorageResult {
    pub fn new<S: Into<String>>(provider: S) -> Self {
        Self {
            provider: provider.into(),
            locator: None,
            backend_id: None,
            raw: Map::new(),
        }
    }

    pub fn with_locator<S: Into<String>>(mut self, locator: S) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_backend_id<S: Into<String>>(mut self, id: S) -> Self {
        self.backend_id = Some(id.into());
        self
    }

    /// Attach a backend-specific field. The reserved keys `provider`, `url`
    /// and `attachment_id` are ignored.
    pub fn with_field<K: Into<String>, V: Serialize>(mut self, key: K, value: V) -> Self {
        let key = key.into();
        if !Self::is_reserved(&key) {
            self.raw
                .insert(key, serde_json::to_value(value).unwrap_or(Value::Null));
        }
        self
    }

    pub fn is_default(&self) -> bool {
        self.provider == crate::DEFAULT_PROVIDER
    }

    fn is_reserved(key: &str) -> bool {
        matches!(key, "provider" | "url" | "locator" | "attachment_id" | "backend_id")
    }

    /// The `storage` object of the intake response.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("provider".to_string(), Value::String(self.provider.clone()));
        map.insert(
            "url".to_string(),
            self.locator.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(
            "attachment_id".to_string(),
            self.backend_id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        for (k, v) in &self.raw {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Value::Object(map)
    }

    /// Read a StorageResult-shaped mapping, as produced by handlers that speak
    /// JSON or by clients reading a response.
    ///
    /// `url`/`locator` and `attachment_id`/`backend_id` are accepted as
    /// aliases; ids may be strings or numbers. A missing provider becomes
    /// [`EXTERNAL_PROVIDER`]. Anything else lands in `raw`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let provider = obj
            .get("provider")
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(EXTERNAL_PROVIDER)
            .to_string();
        let locator = ["url", "locator"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(scalar_to_string));
        let backend_id = ["attachment_id", "backend_id"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(scalar_to_string));

        let raw = obj
            .iter()
            .filter(|(k, _)| !Self::is_reserved(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            provider,
            locator,
            backend_id,
            raw,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Serialize for StorageResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StorageResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("storage result must be a JSON object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_shape_flattens_locator_and_id() {
        let result = StorageResult::new("default")
            .with_locator("https://media.example/2024/03/a.webm")
            .with_backend_id("a")
            .with_field("title", "Voice Recording");

        let json = result.to_json();
        assert_eq!(json["provider"], "default");
        assert_eq!(json["url"], "https://media.example/2024/03/a.webm");
        assert_eq!(json["attachment_id"], "a");
        assert_eq!(json["title"], "Voice Recording");
    }

    #[test]
    fn raw_fields_cannot_shadow_reserved_keys() {
        let result = StorageResult::new("external-x").with_field("provider", "spoofed");
        assert_eq!(result.to_json()["provider"], "external-x");
        assert!(result.raw.is_empty());
    }

    #[test]
    fn mapping_accepts_aliases_and_numeric_ids() {
        let parsed = StorageResult::from_json(&json!({
            "provider": "bunny",
            "locator": "https://cdn.example/v.webm",
            "backend_id": 981,
            "zone": "eu"
        }))
        .unwrap();

        assert_eq!(parsed.provider, "bunny");
        assert_eq!(parsed.locator.as_deref(), Some("https://cdn.example/v.webm"));
        assert_eq!(parsed.backend_id.as_deref(), Some("981"));
        assert_eq!(parsed.raw["zone"], "eu");
    }

    #[test]
    fn mapping_without_provider_or_id_is_still_valid() {
        let parsed = StorageResult::from_json(&json!({ "url": "https://x/y" })).unwrap();
        assert_eq!(parsed.provider, EXTERNAL_PROVIDER);
        assert_eq!(parsed.backend_id, None);
        assert!(StorageResult::from_json(&json!("nope")).is_none());
    }
}
