//! Persistence contract for reports and dead letters
//!
//! A [`Collection`] is a document collection in some NoSQL store. Items travel as JSON
//! values; [`CollectionExt`] adds typed helpers on top. Queries are structured
//! equality filters ([`Query`]) that each collection evaluates natively and can render
//! into its own SQL-like dialect for logging.

pub mod memory;

pub use memory::InMemoryCollection;

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Default collection names
pub const REPORTS_COLLECTION: &str = "Reports";
pub const DEAD_LETTER_COLLECTION: &str = "Reports-DeadLetter";

/// A document collection
pub trait Collection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Fetch one item by id
    fn get_item(&self, id: &str) -> Result<Option<Value>>;

    /// Every item matching `query`
    fn query_items(&self, query: &Query) -> Result<Vec<Value>>;

    /// Create an item; `false` when an item with the same id already exists
    fn create_item(&self, id: &str, item: Value, partition_key: Option<&str>) -> Result<bool>;

    /// Delete an item; `false` when nothing matched
    fn delete_item(&self, id: &str, partition_key: Option<&str>) -> Result<bool>;

    /// Name of the collection as written in queries
    fn collection_name_for_query(&self) -> String {
        self.name().to_string()
    }

    /// Alias bound to the collection in queries, empty when the dialect has none
    fn collection_variable(&self) -> &str {
        "r"
    }

    /// Prefix placed before element names in query clauses
    fn collection_variable_prefix(&self) -> String {
        let variable = self.collection_variable();
        if variable.is_empty() {
            String::new()
        } else {
            format!("{}.", variable)
        }
    }

    /// Element name as written in queries
    fn collection_element_for_query(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Typed access on top of [`Collection`]
pub trait CollectionExt: Collection {
    fn create<T: Serialize>(&self, id: &str, item: &T, partition_key: Option<&str>) -> Result<bool> {
        self.create_item(id, serde_json::to_value(item)?, partition_key)
    }

    fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        self.get_item(id)?
            .map(|item| serde_json::from_value(item).map_err(Error::from))
            .transpose()
    }

    fn query<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        self.query_items(query)?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Error::from))
            .collect()
    }
}

impl<C: Collection + ?Sized> CollectionExt for C {}

/// Equality filters combined with `and`.
///
/// Field names may be dotted to reach into nested objects, e.g. `stageInfo.action`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
}

impl Query {
    /// A query matching every item
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality filter
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    /// Whether `item` satisfies every filter
    pub fn matches(&self, item: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| lookup(item, field) == Some(expected))
    }

    /// Render in the dialect of `collection`
    pub fn render<C: Collection + ?Sized>(&self, collection: &C) -> String {
        let prefix = collection.collection_variable_prefix();
        let mut sql = format!(
            "select * from {} {}",
            collection.collection_name_for_query(),
            collection.collection_variable()
        )
        .trim_end()
        .to_string();

        for (i, (field, value)) in self.filters.iter().enumerate() {
            let element = field
                .split('.')
                .map(|part| collection.collection_element_for_query(part))
                .collect::<Vec<_>>()
                .join(".");
            sql.push_str(if i == 0 { " where " } else { " and " });
            sql.push_str(&format!("{}{} = {}", prefix, element, literal(value)));
        }
        sql
    }
}

fn lookup<'a>(item: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted.split('.').try_fold(item, |node, key| node.get(key))
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}

/// The collections the report sink writes to
#[derive(Clone)]
pub struct Repository {
    pub reports: Arc<dyn Collection>,
    pub dead_letters: Arc<dyn Collection>,
}

impl Repository {
    pub fn new(reports: Arc<dyn Collection>, dead_letters: Arc<dyn Collection>) -> Self {
        Self { reports, dead_letters }
    }

    /// Repository backed by two fresh in-memory collections
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCollection::new(REPORTS_COLLECTION)),
            Arc::new(InMemoryCollection::new(DEAD_LETTER_COLLECTION)),
        )
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("reports", &self.reports.name())
            .field("dead_letters", &self.dead_letters.name())
            .finish()
    }
}
