//! In-Memory Record Store
//!
//! Table-per-key map used for agent fixtures in tests and simulated runs.
//! Rows get a generated `id` on insert when one is not supplied.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use super::{Filter, RecordStore, Row};
use crate::types::Result;

/// Thread-safe in-memory record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count for a table (0 when the table has never been written)
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: &str, mut row: Row) -> Result<Row> {
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<usize> {
        let mut updated = 0;
        if let Some(mut rows) = self.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                for (field, value) in &patch {
                    row.insert(field.clone(), value.clone());
                }
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        let mut removed = 0;
        if let Some(mut rows) = self.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|r| !filter.matches(r));
            removed = before - rows.len();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::row;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id() {
        let store = MemoryStore::new();
        let inserted = store
            .insert("habits", row(&[("name", json!("hydrate"))]))
            .await
            .unwrap();
        assert!(inserted.contains_key("id"));
        assert_eq!(store.len("habits"), 1);
    }

    #[tokio::test]
    async fn select_filters_rows() {
        let store = MemoryStore::new();
        store
            .insert("tasks", row(&[("user_id", json!("u1")), ("done", json!(false))]))
            .await
            .unwrap();
        store
            .insert("tasks", row(&[("user_id", json!("u2")), ("done", json!(true))]))
            .await
            .unwrap();

        let rows = store
            .select("tasks", &Filter::new().eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["done"], json!(false));
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let store = MemoryStore::new();
        store
            .insert("goals", row(&[("title", json!("run 5k")), ("done", json!(false))]))
            .await
            .unwrap();

        let updated = store
            .update(
                "goals",
                &Filter::new().eq("title", "run 5k"),
                row(&[("done", json!(true))]),
            )
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let rows = store.select("goals", &Filter::new()).await.unwrap();
        assert_eq!(rows[0]["done"], json!(true));
    }

    #[tokio::test]
    async fn delete_removes_matching_rows() {
        let store = MemoryStore::new();
        store
            .insert("habits", row(&[("owner", json!("qa_fixture"))]))
            .await
            .unwrap();
        store
            .insert("habits", row(&[("owner", json!("real_user"))]))
            .await
            .unwrap();

        let removed = store
            .delete("habits", &Filter::new().eq("owner", "qa_fixture"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len("habits"), 1);
    }

    #[tokio::test]
    async fn select_unknown_table_is_empty() {
        let store = MemoryStore::new();
        let rows = store.select("missing", &Filter::new()).await.unwrap();
        assert!(rows.is_empty());
    }
}
