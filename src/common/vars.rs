//! JSON object wrapper used for node configs, agent outputs and run context snapshots.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// An ordered JSON object with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vars {
    inner: Map<String, Value>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value by key, converting it into JSON.
    pub fn set<V>(
        &mut self,
        key: &str,
        value: V,
    ) where
        V: Into<Value>,
    {
        self.inner.insert(key.to_string(), value.into());
    }

    /// Get a value by key, deserialized into `T`.
    pub fn get<T>(
        &self,
        key: &str,
    ) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.inner.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get the raw JSON value by key.
    pub fn get_value(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }
}

impl From<Value> for Vars {
    /// Objects are taken as-is, any other value is wrapped as `{"value": ...}`.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(inner) => Self {
                inner,
            },
            Value::Null => Self::new(),
            other => {
                let mut vars = Self::new();
                vars.set("value", other);
                vars
            }
        }
    }
}

impl From<Vars> for Value {
    fn from(vars: Vars) -> Self {
        Value::Object(vars.inner)
    }
}

impl From<Map<String, Value>> for Vars {
    fn from(inner: Map<String, Value>) -> Self {
        Self {
            inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Vars;

    #[test]
    fn test_set_and_get() {
        let mut vars = Vars::new();
        vars.set("symbol", "BTC");
        vars.set("amount", 1000);

        assert_eq!(vars.get::<String>("symbol"), Some("BTC".to_string()));
        assert_eq!(vars.get::<i64>("amount"), Some(1000));
        assert_eq!(vars.get::<String>("missing"), None);
    }

    #[test]
    fn test_from_non_object_wraps_value() {
        let vars = Vars::from(json!([1, 2, 3]));
        assert_eq!(vars.get_value("value"), Some(&json!([1, 2, 3])));
        assert!(Vars::from(json!(null)).is_empty());
    }

    #[test]
    fn test_serializes_transparently() {
        let mut vars = Vars::new();
        vars.set("a", 1);
        assert_eq!(serde_json::to_value(&vars).unwrap(), json!({"a": 1}));
    }
}
