//! Caching decorator for schema loaders
//!
//! Schema files are read on every validated report but change rarely, so any
//! [`SchemaLoader`] can be wrapped in a [`CachedSchemaLoader`]. Entries expire after a
//! TTL; "not found" results are cached too, with a shorter TTL. Concurrent misses for
//! the same file name collapse into one upstream fetch.
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::LoaderResult;
use crate::loader::SchemaLoader;
use crate::schema_file::{content_schema_file_name, ReportSchemaMetadata, SchemaFile, SchemaLoaderInfo};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Source of the current time for cache expiry
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to; used to exercise expiry deterministically
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Configuration for cache behavior
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether to cache at all
    pub enabled: bool,
    /// Lifetime of a cached schema that exists
    pub ttl: Duration,
    /// Lifetime of a cached "not found" result
    pub negative_ttl: Duration,
    /// Lifetime of the cached schema listing
    pub listing_ttl: Duration,
    /// Soft cap on cached file entries; expired entries are purged when exceeded
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(15 * 60),
            negative_ttl: Duration::from_secs(60),
            listing_ttl: Duration::from_secs(5 * 60),
            max_entries: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    file: SchemaFile,
    cached_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, config: &CacheConfig) -> bool {
        let ttl = if self.file.exists() {
            config.ttl
        } else {
            config.negative_ttl
        };
        now.saturating_duration_since(self.cached_at) < ttl
    }
}

#[derive(Debug, Clone)]
struct ListingEntry {
    schemas: Vec<ReportSchemaMetadata>,
    cached_at: Instant,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    invalidations: AtomicU64,
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Upstream `load_schema_file` calls made on behalf of callers
    pub fetches: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTL cache decorator over any [`SchemaLoader`]
pub struct CachedSchemaLoader<L> {
    inner: L,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, CacheEntry>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    listing: Mutex<Option<ListingEntry>>,
    counters: Counters,
}

impl<L: SchemaLoader> CachedSchemaLoader<L> {
    /// Wrap a loader with the default cache configuration
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: L, config: CacheConfig) -> Self {
        Self::with_clock(inner, config, Arc::new(SystemClock))
    }

    pub fn with_clock(inner: L, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            config,
            clock,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            listing: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// The wrapped loader
    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Drop the cached entry for one file name and the cached listing.
    ///
    /// Waits for an in-flight load of the same name so a fetch that started before the
    /// invalidation cannot repopulate the cache afterwards.
    pub fn invalidate(&self, filename: &str) {
        let key_lock = self.key_lock(filename);
        {
            let _guard = key_lock.lock();
            self.entries.remove(filename);
        }
        drop(key_lock);
        self.release_key_lock(filename);
        *self.listing.lock() = None;
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(schema_file = filename, "Invalidated cached schema file");
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.entries.clear();
        *self.listing.lock() = None;
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }

    fn fresh_entry(&self, filename: &str) -> Option<SchemaFile> {
        let now = self.clock.now();
        self.entries
            .get(filename)
            .filter(|entry| entry.is_fresh(now, &self.config))
            .map(|entry| entry.file.clone())
    }

    fn key_lock(&self, filename: &str) -> Arc<Mutex<()>> {
        self.in_flight
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release_key_lock(&self, filename: &str) {
        // Only the map still holds it: nobody is waiting.
        self.in_flight
            .remove_if(filename, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn store(&self, file: &SchemaFile) {
        if self.entries.len() >= self.config.max_entries {
            let now = self.clock.now();
            self.entries.retain(|_, entry| entry.is_fresh(now, &self.config));
        }
        self.entries.insert(
            file.name().to_string(),
            CacheEntry {
                file: file.clone(),
                cached_at: self.clock.now(),
            },
        );
    }

    fn load_through(&self, filename: &str) -> LoaderResult<SchemaFile> {
        let key_lock = self.key_lock(filename);
        let result = {
            let _guard = key_lock.lock();
            if let Some(file) = self.fresh_entry(filename) {
                trace!(schema_file = filename, "Schema file populated by a concurrent load");
                Ok(file)
            } else {
                self.counters.fetches.fetch_add(1, Ordering::Relaxed);
                let loaded = self.inner.load_schema_file(filename);
                if let Ok(file) = &loaded {
                    self.store(file);
                }
                loaded
            }
        };
        drop(key_lock);
        self.release_key_lock(filename);
        result
    }
}

impl<L: SchemaLoader> SchemaLoader for CachedSchemaLoader<L> {
    fn load_schema_file(&self, filename: &str) -> LoaderResult<SchemaFile> {
        if !self.config.enabled {
            return self.inner.load_schema_file(filename);
        }

        if let Some(file) = self.fresh_entry(filename) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(schema_file = filename, exists = file.exists(), "Schema cache hit");
            return Ok(file);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(schema_file = filename, "Schema cache miss");
        self.load_through(filename)
    }

    fn schema_files(&self) -> LoaderResult<Vec<ReportSchemaMetadata>> {
        if !self.config.enabled {
            return self.inner.schema_files();
        }

        let mut listing = self.listing.lock();
        let now = self.clock.now();
        if let Some(entry) = listing.as_ref() {
            if now.saturating_duration_since(entry.cached_at) < self.config.listing_ttl {
                return Ok(entry.schemas.clone());
            }
        }

        let schemas = self.inner.schema_files()?;
        *listing = Some(ListingEntry {
            schemas: schemas.clone(),
            cached_at: now,
        });
        Ok(schemas)
    }

    fn info(&self) -> SchemaLoaderInfo {
        self.inner.info()
    }

    fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> LoaderResult<String> {
        let result = self.inner.upsert_schema(schema_name, schema_version, content);
        self.invalidate(&content_schema_file_name(schema_name, schema_version));
        result
    }

    fn remove_schema(&self, schema_name: &str, schema_version: &str) -> LoaderResult<String> {
        let result = self.inner.remove_schema(schema_name, schema_version);
        self.invalidate(&content_schema_file_name(schema_name, schema_version));
        result
    }
}

impl<L: fmt::Debug> fmt::Debug for CachedSchemaLoader<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSchemaLoader")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .finish()
    }
}
