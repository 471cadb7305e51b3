//! In-memory substrate.

use super::{
    AggregateRow, Aggregation, IndexDefinition, SearchQuery, SearchResult, SetMode, Substrate, eval,
};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound::{Included, Unbounded};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    documents: BTreeMap<String, Value>,
    indexes: BTreeMap<String, IndexDefinition>,
}

/// Process-local substrate. Every operation holds the state lock for its
/// whole duration, so single-key writes and deletes are atomic.
#[derive(Default)]
pub struct MemorySubstrate {
    state: RwLock<State>,
}

impl MemorySubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all prefixes.
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn index_of<'a>(state: &'a State, name: &str) -> StoreResult<&'a IndexDefinition> {
    state
        .indexes
        .get(name)
        .ok_or_else(|| StoreError::UnknownIndex(name.to_string()))
}

fn under_prefix<'a>(
    documents: &'a BTreeMap<String, Value>,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
    documents
        .range::<str, _>((Included(prefix), Unbounded))
        .take_while(move |(key, _)| key.starts_with(prefix))
}

#[async_trait]
impl Substrate for MemorySubstrate {
    async fn create_index(&self, name: &str, definition: &IndexDefinition) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.indexes.contains_key(name) {
            return Err(StoreError::IndexExists(name.to_string()));
        }
        state.indexes.insert(name.to_string(), definition.clone());
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.indexes.contains_key(name))
    }

    async fn drop_index(&self, name: &str) -> StoreResult<()> {
        match self.state.write().await.indexes.remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownIndex(name.to_string())),
        }
    }

    async fn list_indexes(&self) -> StoreResult<Vec<String>> {
        Ok(self.state.read().await.indexes.keys().cloned().collect())
    }

    async fn json_set(&self, key: &str, value: &Value, mode: SetMode) -> StoreResult<bool> {
        if !value.is_object() {
            return Err(StoreError::Substrate {
                key: key.to_string(),
                message: "document root must be an object".to_string(),
            });
        }
        let mut state = self.state.write().await;
        if mode == SetMode::IfAbsent && state.documents.contains_key(key) {
            return Ok(false);
        }
        state.documents.insert(key.to_string(), value.clone());
        Ok(true)
    }

    async fn json_get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.state.read().await.documents.get(key).cloned())
    }

    async fn unlink(&self, key: &str) -> StoreResult<u64> {
        let removed = self.state.write().await.documents.remove(key);
        Ok(u64::from(removed.is_some()))
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> StoreResult<SearchResult> {
        let state = self.state.read().await;
        let definition = index_of(&state, index)?;
        eval::search(
            definition,
            under_prefix(&state.documents, &definition.prefix),
            query,
        )
    }

    async fn aggregate(
        &self,
        index: &str,
        aggregation: &Aggregation,
    ) -> StoreResult<Vec<AggregateRow>> {
        let state = self.state.read().await;
        let definition = index_of(&state, index)?;
        eval::aggregate(
            definition,
            under_prefix(&state.documents, &definition.prefix),
            aggregation,
        )
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::SchemaField;
    use serde_json::json;
    use std::sync::Arc;

    fn definition() -> IndexDefinition {
        IndexDefinition::new("things:", vec![SchemaField::sortable_tag("name")])
    }

    #[tokio::test]
    async fn test_if_absent_does_not_overwrite() {
        let substrate = MemorySubstrate::new();
        assert!(
            substrate
                .json_set("things:a", &json!({"name": "one"}), SetMode::IfAbsent)
                .await
                .unwrap()
        );
        assert!(
            !substrate
                .json_set("things:a", &json!({"name": "two"}), SetMode::IfAbsent)
                .await
                .unwrap()
        );
        let stored = substrate.json_get("things:a").await.unwrap().unwrap();
        assert_eq!(stored["name"], "one");
    }

    #[tokio::test]
    async fn test_rejects_non_object_documents() {
        let substrate = MemorySubstrate::new();
        let result = substrate
            .json_set("things:a", &json!("text"), SetMode::Always)
            .await;
        assert!(matches!(result, Err(StoreError::Substrate { .. })));
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let substrate = MemorySubstrate::new();
        substrate.create_index("things:index", &definition()).await.unwrap();
        assert!(matches!(
            substrate.create_index("things:index", &definition()).await,
            Err(StoreError::IndexExists(_))
        ));
        assert_eq!(substrate.list_indexes().await.unwrap(), vec!["things:index"]);

        substrate
            .json_set("things:a", &json!({"name": "one"}), SetMode::Always)
            .await
            .unwrap();
        substrate.drop_index("things:index").await.unwrap();
        assert!(!substrate.index_exists("things:index").await.unwrap());
        // documents survive the index
        assert_eq!(substrate.len().await, 1);
        assert!(matches!(
            substrate.search("things:index", &SearchQuery::all()).await,
            Err(StoreError::UnknownIndex(_))
        ));
    }

    #[tokio::test]
    async fn test_search_only_sees_indexed_prefix() {
        let substrate = MemorySubstrate::new();
        substrate.create_index("things:index", &definition()).await.unwrap();
        for (key, name) in [("things:a", "x"), ("thingsx:b", "x"), ("other:c", "x")] {
            substrate
                .json_set(key, &json!({ "name": name }), SetMode::Always)
                .await
                .unwrap();
        }
        let result = substrate
            .search("things:index", &SearchQuery::new("@name:{ x }"))
            .await
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.documents[0].key, "things:a");
    }

    #[tokio::test]
    async fn test_concurrent_unlink_removes_once() {
        let substrate = Arc::new(MemorySubstrate::new());
        substrate
            .json_set("things:a", &json!({"name": "one"}), SetMode::Always)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let substrate = Arc::clone(&substrate);
            handles.push(tokio::spawn(async move { substrate.unlink("things:a").await }));
        }
        let mut removed = 0;
        for handle in handles {
            removed += handle.await.unwrap().unwrap();
        }
        assert_eq!(removed, 1);
    }
}
