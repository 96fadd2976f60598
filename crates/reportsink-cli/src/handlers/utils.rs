//! Shared utilities for command handlers

use crate::config::Config;
use crate::error::{Error, ErrorContext, Result};
use reportsink_core::ValidationOrchestrator;
use reportsink_schemas::{build_loader, CachedSchemaLoader, JsonSchemaValidator, SchemaLoader, SchemaValidator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Loader and validator shared by every operation of one command
#[derive(Clone)]
pub struct Pipeline {
    pub loader: Arc<dyn SchemaLoader>,
    pub validator: Arc<dyn SchemaValidator>,
}

impl Pipeline {
    /// Build the configured loader, cached unless the cache is disabled.
    ///
    /// Object-store loaders use a blocking HTTP client; call this from blocking context.
    pub fn from_config(config: &Config) -> Result<Self> {
        let inner = build_loader(&config.schema_loader)?;
        let cache = config.cache.to_cache_config();
        debug!(enabled = cache.enabled, ttl_secs = cache.ttl.as_secs(), "Schema cache");

        Ok(Self {
            loader: Arc::new(CachedSchemaLoader::with_config(inner, cache)),
            validator: Arc::new(JsonSchemaValidator::new()),
        })
    }

    pub fn orchestrator(&self) -> ValidationOrchestrator {
        ValidationOrchestrator::new(self.loader.clone(), self.validator.clone())
    }
}

/// Apply a `--schemas` override to a copy of the configuration
pub fn with_schema_dir(config: &Config, schemas: Option<&Path>) -> Config {
    let mut config = config.clone();
    if let Some(dir) = schemas {
        config.use_schema_dir(dir);
    }
    config
}

/// Read a text file, reporting a missing file distinctly
pub fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Run synchronous loader and sink work off the async runtime
pub async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::other(format!("Worker task failed: {}", e)))?
}

/// Files of a directory with the given extension, sorted by name
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}
