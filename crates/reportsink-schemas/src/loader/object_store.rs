//! Schema loader backed by an object store bucket or container
//!
//! The loader only knows how schema file names map to object keys and how existence is
//! reported; moving bytes is delegated to an [`ObjectStoreTransport`].
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::{LoaderError, LoaderResult};
use crate::loader::SchemaLoader;
use crate::schema_file::{content_schema_file_name, ReportSchemaMetadata, SchemaFile, SchemaLoaderInfo};
use parking_lot::RwLock;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Byte transport for one bucket or container
pub trait ObjectStoreTransport: Send + Sync {
    /// Fetch an object, `None` when the key does not exist
    fn get(&self, key: &str) -> LoaderResult<Option<Vec<u8>>>;

    /// Create or overwrite an object
    fn put(&self, key: &str, bytes: Vec<u8>) -> LoaderResult<()>;

    /// Delete an object, returning whether it existed
    fn delete(&self, key: &str) -> LoaderResult<bool>;

    /// Every key in the bucket or container
    fn list(&self) -> LoaderResult<Vec<String>>;
}

/// Which kind of object store holds the schemas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreProvider {
    /// S3-compatible bucket
    S3 { bucket: String, region: String },
    /// Blob-storage-compatible container
    Blob { container: String },
}

impl ObjectStoreProvider {
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self::S3 {
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    pub fn blob(container: impl Into<String>) -> Self {
        Self::Blob {
            container: container.into(),
        }
    }

    /// Loader system name as used in configuration
    pub fn system(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::Blob { .. } => "blob_storage",
        }
    }

    /// Bucket or container name
    pub fn location(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::Blob { container } => container,
        }
    }
}

/// Loads schema files stored as objects, one object per schema file name
#[derive(Debug)]
pub struct ObjectStoreLoader<T> {
    provider: ObjectStoreProvider,
    transport: T,
}

impl<T: ObjectStoreTransport> ObjectStoreLoader<T> {
    pub fn new(provider: ObjectStoreProvider, transport: T) -> Self {
        Self { provider, transport }
    }

    pub fn provider(&self) -> &ObjectStoreProvider {
        &self.provider
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: ObjectStoreTransport> SchemaLoader for ObjectStoreLoader<T> {
    fn load_schema_file(&self, filename: &str) -> LoaderResult<SchemaFile> {
        if !is_plain_object_key(filename) {
            warn!(
                schema_file = filename,
                store = self.provider.location(),
                "Refusing to resolve schema file name outside the store"
            );
            return Ok(SchemaFile::missing(filename));
        }

        match self.transport.get(filename)? {
            Some(bytes) => {
                debug!(
                    schema_file = filename,
                    store = self.provider.location(),
                    bytes = bytes.len(),
                    "Loaded schema object"
                );
                Ok(SchemaFile::found(filename, bytes))
            }
            None => Ok(SchemaFile::missing(filename)),
        }
    }

    fn schema_files(&self) -> LoaderResult<Vec<ReportSchemaMetadata>> {
        let mut schemas = Vec::new();
        for key in self.transport.list()? {
            if !key.ends_with(".json") {
                continue;
            }
            // A key listed a moment ago may be gone by now.
            if let Some(bytes) = self.transport.get(&key)? {
                schemas.push(ReportSchemaMetadata::from_content(&key, &bytes));
            }
        }
        schemas.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(schemas)
    }

    fn info(&self) -> SchemaLoaderInfo {
        SchemaLoaderInfo::new(self.provider.system(), self.provider.location())
    }

    fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> LoaderResult<String> {
        let filename = content_schema_file_name(schema_name, schema_version);
        self.transport.put(&filename, content.as_bytes().to_vec())?;
        Ok(filename)
    }

    fn remove_schema(&self, schema_name: &str, schema_version: &str) -> LoaderResult<String> {
        let filename = content_schema_file_name(schema_name, schema_version);
        if self.transport.delete(&filename)? {
            Ok(filename)
        } else {
            Err(LoaderError::schema_not_found(filename))
        }
    }
}

/// Whether `key` names one object of the bucket or container and nothing else
fn is_plain_object_key(key: &str) -> bool {
    !key.is_empty() && key != "." && !key.contains("..") && !key.contains(['/', '\\', '?', '#'])
}

/// Process-local object store.
///
/// Counts `get` calls and can be told to fail upcoming reads, which makes it useful for
/// exercising caching and outage handling.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    gets: AtomicU64,
    failing_gets: AtomicU32,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().insert(key.into(), bytes);
    }

    /// Number of `get` calls served so far, including failed ones
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    /// Make the next `count` reads fail as if the store were unreachable
    pub fn fail_next_gets(&self, count: u32) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ObjectStoreTransport for InMemoryObjectStore {
    fn get(&self, key: &str) -> LoaderResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(LoaderError::fetch("memory://", key, "object store unavailable"));
        }
        Ok(self.objects.read().get(key).cloned())
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> LoaderResult<()> {
        self.insert(key, bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> LoaderResult<bool> {
        Ok(self.objects.write().remove(key).is_some())
    }

    fn list(&self) -> LoaderResult<Vec<String>> {
        Ok(self.objects.read().keys().cloned().collect())
    }
}

/// Read-only transport fetching objects over HTTPS from a bucket or container endpoint.
///
/// Objects are addressed as `<base_url>/<key>`, optionally followed by a query string
/// such as a shared access signature. The key is always one percent-encoded path segment.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: Url,
    query: Option<String>,
}

impl HttpObjectStore {
    /// Default request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(base_url: impl Into<String>) -> LoaderResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> LoaderResult<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| LoaderError::configuration(format!("Invalid object store URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LoaderError::configuration(format!(
                "Object store URL '{}' cannot address objects",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoaderError::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            query: None,
        })
    }

    /// Append a query string (without the leading `?`) to every request
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = Some(query.trim_start_matches('?').to_string()).filter(|q| !q.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn object_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        if let Some(query) = &self.query {
            url.set_query(Some(query));
        }
        url
    }
}

impl ObjectStoreTransport for HttpObjectStore {
    fn get(&self, key: &str) -> LoaderResult<Option<Vec<u8>>> {
        let response = self
            .client
            .get(self.object_url(key))
            .send()
            .map_err(|e| LoaderError::fetch_with_source(self.base_url(), key, e))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(key, status = status.as_u16(), "Object store denied access to schema");
                Err(LoaderError::Unauthorized {
                    location: self.base_url().to_string(),
                    key: key.to_string(),
                    status: status.as_u16(),
                })
            }
            s if s.is_success() => response
                .bytes()
                .map(|bytes| Some(bytes.to_vec()))
                .map_err(|e| LoaderError::fetch_with_source(self.base_url(), key, e)),
            s => Err(LoaderError::fetch(
                self.base_url(),
                key,
                format!("unexpected HTTP status {}", s.as_u16()),
            )),
        }
    }

    fn put(&self, _key: &str, _bytes: Vec<u8>) -> LoaderResult<()> {
        Err(LoaderError::unsupported_operation("http object store", "put"))
    }

    fn delete(&self, _key: &str) -> LoaderResult<bool> {
        Err(LoaderError::unsupported_operation("http object store", "delete"))
    }

    fn list(&self) -> LoaderResult<Vec<String>> {
        Err(LoaderError::unsupported_operation("http object store", "list"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_loader() -> ObjectStoreLoader<InMemoryObjectStore> {
        let store = InMemoryObjectStore::new();
        store.insert("base.1.0.0.schema.json", br#"{"title":"Base"}"#.to_vec());
        store.insert("notes.txt", b"ignore me".to_vec());
        ObjectStoreLoader::new(ObjectStoreProvider::blob("report-schemas"), store)
    }

    #[test]
    fn test_load_and_not_found() -> LoaderResult<()> {
        let loader = blob_loader();
        assert!(loader.load_schema_file("base.1.0.0.schema.json")?.exists());
        assert!(!loader.load_schema_file("base.0.0.1.schema.json")?.exists());
        Ok(())
    }

    #[test]
    fn test_outage_is_an_error_not_a_missing_file() {
        let loader = blob_loader();
        loader.transport().fail_next_gets(1);
        let err = loader.load_schema_file("base.1.0.0.schema.json").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_listing_skips_non_json() -> LoaderResult<()> {
        let files = blob_loader().schema_files()?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].schema_name, "base");
        assert_eq!(files[0].description, "Base");
        Ok(())
    }

    #[test]
    fn test_info_and_admin() -> LoaderResult<()> {
        let loader = blob_loader();
        assert_eq!(loader.info(), SchemaLoaderInfo::new("blob_storage", "report-schemas"));

        let name = loader.upsert_schema("hl7v2-debatch", "2.0.0", "{}")?;
        assert!(loader.load_schema_file(&name)?.exists());
        loader.remove_schema("hl7v2-debatch", "2.0.0")?;
        assert!(matches!(
            loader.remove_schema("hl7v2-debatch", "2.0.0"),
            Err(LoaderError::SchemaNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_http_store_urls() -> LoaderResult<()> {
        let store = HttpObjectStore::new("https://schemas.s3.us-east-1.amazonaws.com/")?;
        assert_eq!(
            store.object_url("base.1.0.0.schema.json").as_str(),
            "https://schemas.s3.us-east-1.amazonaws.com/base.1.0.0.schema.json"
        );

        let store = store.with_query("?sv=2024&sig=abc");
        assert_eq!(
            store.object_url("a.1.0.schema.json").as_str(),
            "https://schemas.s3.us-east-1.amazonaws.com/a.1.0.schema.json?sv=2024&sig=abc"
        );
        assert!(matches!(
            store.list(),
            Err(LoaderError::UnsupportedOperation { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_http_store_keeps_key_in_one_segment() -> LoaderResult<()> {
        let store = HttpObjectStore::new("https://acct.blob.core.windows.net/report-schemas")?
            .with_query("sv=2024&sig=abc");

        let url = store.object_url("../other-container/secret.1.0.schema.json");
        assert_eq!(url.path(), "/report-schemas/..%2Fother-container%2Fsecret.1.0.schema.json");

        let url = store.object_url("a#b.1.0.schema.json");
        assert_eq!(url.path(), "/report-schemas/a%23b.1.0.schema.json");
        assert_eq!(url.fragment(), None);

        let url = store.object_url("a?x=1.1.0.schema.json");
        assert_eq!(url.path(), "/report-schemas/a%3Fx=1.1.0.schema.json");
        assert_eq!(url.query(), Some("sv=2024&sig=abc"));
        Ok(())
    }

    #[test]
    fn test_invalid_base_url_is_a_configuration_error() {
        assert!(matches!(
            HttpObjectStore::new("not a url"),
            Err(LoaderError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unsafe_keys_are_missing_without_a_fetch() -> LoaderResult<()> {
        let loader = blob_loader();
        for name in [
            "../other-container/secret.1.0.schema.json",
            "a#b.1.0.schema.json",
            "a?x=1.1.0.schema.json",
            "dir\\base.1.0.0.schema.json",
        ] {
            let file = loader.load_schema_file(name)?;
            assert!(!file.exists(), "{}", name);
            assert_eq!(file.name(), name);
        }
        assert_eq!(loader.transport().get_count(), 0);
        Ok(())
    }
}
