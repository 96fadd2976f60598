//! In-memory collection

use crate::error::Result;
use crate::persistence::{Collection, Query};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredItem {
    id: String,
    partition_key: Option<String>,
    item: Value,
}

/// Process-local collection keeping items in insertion order
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    items: RwLock<Vec<StoredItem>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Every stored item, oldest first
    pub fn items(&self) -> Vec<Value> {
        self.items.read().iter().map(|stored| stored.item.clone()).collect()
    }
}

impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_item(&self, id: &str) -> Result<Option<Value>> {
        Ok(self
            .items
            .read()
            .iter()
            .find(|stored| stored.id == id)
            .map(|stored| stored.item.clone()))
    }

    fn query_items(&self, query: &Query) -> Result<Vec<Value>> {
        debug!(collection = %self.name, query = %query.render(self), "Querying collection");
        Ok(self
            .items
            .read()
            .iter()
            .filter(|stored| query.matches(&stored.item))
            .map(|stored| stored.item.clone())
            .collect())
    }

    fn create_item(&self, id: &str, item: Value, partition_key: Option<&str>) -> Result<bool> {
        let mut items = self.items.write();
        if items.iter().any(|stored| stored.id == id) {
            return Ok(false);
        }
        items.push(StoredItem {
            id: id.to_string(),
            partition_key: partition_key.map(str::to_string),
            item,
        });
        Ok(true)
    }

    fn delete_item(&self, id: &str, partition_key: Option<&str>) -> Result<bool> {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|stored| {
            let partition_matches = partition_key.is_none() || stored.partition_key.as_deref() == partition_key;
            !(stored.id == id && partition_matches)
        });
        Ok(items.len() != before)
    }
}
