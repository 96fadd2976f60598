//! Integration tests for schema loaders and the caching decorator

use reportsink_schemas::loader::{LoaderResult, ObjectStoreTransport};
use reportsink_schemas::{
    base_schema_file_name, CachedSchemaLoader, FileSystemLoader, InMemoryObjectStore,
    LoaderError, ObjectStoreLoader, ObjectStoreProvider, SchemaLoader,
};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Transport that is slow to answer and counts every read
#[derive(Default)]
struct SlowCountingStore {
    inner: InMemoryObjectStore,
    gets: AtomicUsize,
}

impl ObjectStoreTransport for SlowCountingStore {
    fn get(&self, key: &str) -> LoaderResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        self.inner.get(key)
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> LoaderResult<()> {
        self.inner.put(key, bytes)
    }

    fn delete(&self, key: &str) -> LoaderResult<bool> {
        self.inner.delete(key)
    }

    fn list(&self) -> LoaderResult<Vec<String>> {
        self.inner.list()
    }
}

#[test]
fn test_concurrent_misses_fetch_once() {
    let store = SlowCountingStore::default();
    store
        .inner
        .insert(base_schema_file_name("1.0.0"), br#"{"type":"object"}"#.to_vec());
    let loader = Arc::new(CachedSchemaLoader::new(ObjectStoreLoader::new(
        ObjectStoreProvider::s3("reports", "us-east-1"),
        store,
    )));

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = Arc::clone(&loader);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                loader.load_schema_file("base.1.0.0.schema.json")
            })
        })
        .collect();

    for handle in handles {
        let file = handle.join().unwrap().unwrap();
        assert!(file.exists());
    }

    assert_eq!(loader.inner().transport().gets.load(Ordering::SeqCst), 1);
    let stats = loader.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_file_system_loader_through_cache_sees_admin_changes() {
    let dir = tempdir().unwrap();
    let loader = CachedSchemaLoader::new(FileSystemLoader::new(dir.path()));

    assert!(!loader.load_schema_file("upload.1.0.0.schema.json").unwrap().exists());

    loader.upsert_schema("upload", "1.0.0", r#"{"title":"Upload"}"#).unwrap();
    assert!(loader.load_schema_file("upload.1.0.0.schema.json").unwrap().exists());

    let listed = loader.schema_files().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].description, "Upload");

    loader.remove_schema("upload", "1.0.0").unwrap();
    assert!(!loader.load_schema_file("upload.1.0.0.schema.json").unwrap().exists());
    assert!(loader.schema_files().unwrap().is_empty());
}

#[test]
fn test_unreadable_directory_is_transient() {
    let dir = tempdir().unwrap();
    let file_as_root = dir.path().join("not-a-dir");
    fs::write(&file_as_root, "x").unwrap();

    let loader = FileSystemLoader::new(&file_as_root);
    let err = loader.schema_files().unwrap_err();
    assert!(matches!(err, LoaderError::IoError { .. }));
    assert!(err.is_transient());
}
