use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Environment variables handed to a job.
///
/// Stored as an ordered list of key–value pairs and serialized as a transparent array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobEnv(pub Vec<KeyValue>);

impl JobEnv {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Get the value for a key; the last matching entry wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Builder-style [`JobEnv::push`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::JobEnv;

    #[test]
    fn later_entries_override_earlier() {
        let env = JobEnv::new()
            .with("MODE", "train")
            .with("EPOCHS", "3")
            .with("MODE", "serve");

        assert_eq!(env.get("MODE"), Some("serve"));
        assert_eq!(env.get("EPOCHS"), Some("3"));
        assert!(env.get("MISSING").is_none());
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn serializes_as_plain_array() {
        let env = JobEnv::new().with("FOO", "bar");
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"[{"key":"FOO","value":"bar"}]"#);
    }
}
