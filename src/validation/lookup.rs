//! Persistence collaborator consulted by uniqueness checks

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Answers "does a stored record already hold this value in this column"
#[async_trait]
pub trait UniqueLookup: Send + Sync {
    async fn exists(&self, column: &str, value: &Value) -> Result<bool>;
}

/// In-memory lookup, for tests and demos
#[derive(Debug, Default)]
pub struct InMemoryUniqueLookup {
    columns: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryUniqueLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored value
    pub async fn insert(&self, column: &str, value: Value) {
        self.columns
            .write()
            .await
            .entry(column.to_string())
            .or_default()
            .push(value);
    }
}

#[async_trait]
impl UniqueLookup for InMemoryUniqueLookup {
    async fn exists(&self, column: &str, value: &Value) -> Result<bool> {
        let columns = self.columns.read().await;
        Ok(columns
            .get(column)
            .is_some_and(|values| values.contains(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_exists_only_in_its_column() {
        let lookup = InMemoryUniqueLookup::new();
        lookup.insert("email", json!("a@b.co")).await;

        assert!(lookup.exists("email", &json!("a@b.co")).await.unwrap());
        assert!(!lookup.exists("name", &json!("a@b.co")).await.unwrap());
        assert!(!lookup.exists("email", &json!("c@d.co")).await.unwrap());
    }
}
