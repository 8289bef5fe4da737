//! Record Store Capability
//!
//! Narrow data-store interface agents use for test-fixture lifecycle:
//! create/read/update/delete by table name and filter. No core logic depends
//! on a specific schema beyond table name + row shape.

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Result;

/// One stored record: a JSON object keyed by field name
pub type Row = serde_json::Map<String, Value>;

/// Shared store handle for concurrent agent access
pub type SharedStore = Arc<dyn RecordStore>;

/// Equality filter over row fields; an empty filter matches every row
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a row satisfies every condition
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| row.get(field) == Some(value))
    }
}

/// Narrow capability interface over the hosted data store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a row, returning it as stored (with any generated fields)
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Select rows matching the filter
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>>;

    /// Patch matching rows; returns the number of rows updated
    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<usize>;

    /// Delete matching rows; returns the number of rows removed
    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize>;
}

/// Build a row from field/value pairs
pub fn row(fields: &[(&str, Value)]) -> Row {
    fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        let filter = Filter::new();
        let r = row(&[("name", json!("morning run"))]);
        assert!(filter.matches(&r));
    }

    #[test]
    fn filter_requires_all_conditions() {
        let filter = Filter::new().eq("user_id", "u1").eq("done", true);
        let hit = row(&[("user_id", json!("u1")), ("done", json!(true))]);
        let miss = row(&[("user_id", json!("u1")), ("done", json!(false))]);
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }
}
