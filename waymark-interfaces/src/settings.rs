//! Opaque configuration value passed to adapters and migration units

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Read-only key/value mapping produced once by settings discovery.
///
/// The execution core never looks inside it; adapters and migration units
/// read whatever keys they understand. Cloning is cheap and every clone
/// shares the same underlying map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Arc<Map<String, Value>>);

impl Settings {
    /// Create settings from an already merged mapping
    pub fn new(values: Map<String, Value>) -> Self {
        Self(Arc::new(values))
    }

    /// Settings with no keys
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build settings from a JSON value; anything but an object is rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::new(map)),
            Value::Null => Some(Self::empty()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Sub-object stored under `key`, if there is one
    ///
    /// Adapters use this to pick their own section out of a settings file
    /// shared by several store types.
    pub fn section(&self, key: &str) -> Option<Settings> {
        match self.get(key) {
            Some(Value::Object(map)) => Some(Self::new(map.clone())),
            _ => None,
        }
    }

    /// Resolve a dotted path (`database.port`) to a scalar rendered as text.
    ///
    /// Objects, arrays and nulls have no scalar rendering and yield `None`.
    pub fn lookup_scalar(&self, path: &str) -> Option<String> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }

        match current {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Settings {
        Settings::from_value(json!({
            "url": "sqlite://app.db",
            "sqlite": { "url": "sqlite://other.db", "pool": { "size": 4 } },
            "schema": "public",
            "strict": true,
            "tags": ["a", "b"]
        }))
        .unwrap()
    }

    #[test]
    fn test_scalar_lookup() {
        let settings = sample();
        assert_eq!(settings.lookup_scalar("schema").as_deref(), Some("public"));
        assert_eq!(settings.lookup_scalar("strict").as_deref(), Some("true"));
        assert_eq!(settings.lookup_scalar("sqlite.pool.size").as_deref(), Some("4"));
        assert_eq!(settings.lookup_scalar("sqlite.pool"), None);
        assert_eq!(settings.lookup_scalar("tags"), None);
        assert_eq!(settings.lookup_scalar("missing.key"), None);
    }

    #[test]
    fn test_section() {
        let settings = sample();
        let section = settings.section("sqlite").unwrap();
        assert_eq!(section.get_str("url"), Some("sqlite://other.db"));
        assert!(settings.section("schema").is_none());
        assert!(settings.section("absent").is_none());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Settings::from_value(json!([1, 2])).is_none());
        assert!(Settings::from_value(json!("text")).is_none());
        assert!(Settings::from_value(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let settings = sample();
        let copy = settings.clone();
        assert_eq!(settings, copy);
        assert_eq!(copy.len(), 5);
    }
}
