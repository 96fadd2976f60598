//! Schema administration
//!
//! Upserts are checked before they reach the store: content must be JSON and compile as
//! a Draft 7 schema. Pass the same loader instance the validation pipeline uses so that
//! a caching loader drops its entries for the affected schema.

use crate::error::Result;
use reportsink_schemas::{
    content_schema_file_name, ReportSchemaMetadata, SchemaLoader, SchemaLoaderInfo, SchemaValidator,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Administrative operations on the schema store
#[derive(Clone)]
pub struct SchemaAdmin {
    loader: Arc<dyn SchemaLoader>,
    validator: Arc<dyn SchemaValidator>,
}

impl SchemaAdmin {
    pub fn new(loader: Arc<dyn SchemaLoader>, validator: Arc<dyn SchemaValidator>) -> Self {
        Self { loader, validator }
    }

    /// Check, then add or replace a content schema; returns its file name
    pub fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> Result<String> {
        let filename = content_schema_file_name(schema_name, schema_version);
        self.validator.check_schema(&filename, content)?;
        let filename = self.loader.upsert_schema(schema_name, schema_version, content)?;
        info!(schema_file = %filename, "Schema upserted");
        Ok(filename)
    }

    /// Remove a content schema; returns its file name
    pub fn remove_schema(&self, schema_name: &str, schema_version: &str) -> Result<String> {
        let filename = self.loader.remove_schema(schema_name, schema_version)?;
        info!(schema_file = %filename, "Schema removed");
        Ok(filename)
    }

    /// Check schema content without storing it
    pub fn check_schema(&self, filename: &str, content: &str) -> Result<()> {
        Ok(self.validator.check_schema(filename, content)?)
    }

    pub fn list_schemas(&self) -> Result<Vec<ReportSchemaMetadata>> {
        Ok(self.loader.schema_files()?)
    }

    pub fn schema(&self, schema_name: &str, schema_version: &str) -> Result<Option<Value>> {
        Ok(self.loader.schema_content_for(schema_name, schema_version)?)
    }

    pub fn info(&self) -> SchemaLoaderInfo {
        self.loader.info()
    }
}

impl fmt::Debug for SchemaAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaAdmin")
            .field("loader", &self.loader.info())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use reportsink_schemas::{
        CachedSchemaLoader, InMemoryObjectStore, JsonSchemaValidator, LoaderError, ObjectStoreLoader,
        ObjectStoreProvider,
    };
    use serde_json::json;

    fn admin() -> (SchemaAdmin, Arc<CachedSchemaLoader<ObjectStoreLoader<InMemoryObjectStore>>>) {
        let loader = Arc::new(CachedSchemaLoader::new(ObjectStoreLoader::new(
            ObjectStoreProvider::s3("schemas", "us-east-1"),
            InMemoryObjectStore::new(),
        )));
        let admin = SchemaAdmin::new(loader.clone(), Arc::new(JsonSchemaValidator::new()));
        (admin, loader)
    }

    #[test]
    fn test_invalid_content_never_reaches_store() {
        let (admin, loader) = admin();
        let err = admin.upsert_schema("upload", "1.0.0", "{oops").unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
        assert!(loader.schema_files().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_replaces_cached_content() {
        let (admin, loader) = admin();
        admin.upsert_schema("upload", "1.0.0", r#"{"title": "v1"}"#).unwrap();
        assert_eq!(admin.schema("upload", "1.0.0").unwrap(), Some(json!({"title": "v1"})));

        admin.upsert_schema("upload", "1.0.0", r#"{"title": "v2"}"#).unwrap();
        assert_eq!(admin.schema("upload", "1.0.0").unwrap(), Some(json!({"title": "v2"})));
        assert_eq!(loader.stats().invalidations, 2);
    }

    #[test]
    fn test_remove_missing_schema() {
        let (admin, _) = admin();
        let err = admin.remove_schema("upload", "9.0").unwrap_err();
        assert!(matches!(err, Error::SchemaFetch(LoaderError::SchemaNotFound { .. })));
        assert!(!err.is_transient());
    }
}
