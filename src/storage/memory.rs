//! In-memory storage for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::storage::KeyValueStore;

/// Key-value store that forgets everything on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.insert(key, value);
        store
    }

    fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", "42").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_with_value() {
        let store = MemoryStore::with_value("k", "7");
        assert_eq!(store.get("k").unwrap().as_deref(), Some("7"));
    }
}
