//! Configuration management for the CLI
//!
//! Configuration comes from, in order of precedence:
//! - Command-line arguments
//! - Environment variables
//! - A configuration file (TOML, YAML or JSON)
//! - Default values

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use reportsink_core::RetryPolicy;
use reportsink_schemas::loader::fs::LOCAL_PATH_ENV;
use reportsink_schemas::{CacheConfig, LoaderSystem, SchemaLoaderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where schemas come from
    pub schema_loader: SchemaLoaderConfig,

    /// Schema cache settings
    pub cache: CacheSettings,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// Batch ingestion settings
    pub ingest: IngestConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Output settings
    pub output: OutputConfig,
}

/// Schema cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Lifetime of a cached schema
    pub ttl_secs: u64,
    /// Lifetime of a cached "not found"
    pub negative_ttl_secs: u64,
    /// Lifetime of the cached schema listing
    pub listing_ttl_secs: u64,
}

/// Batch ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Messages processed at once
    pub concurrency: usize,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colored output by default
    pub color: bool,

    /// Show progress indicators during ingest
    pub progress: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            enabled: defaults.enabled,
            ttl_secs: defaults.ttl.as_secs(),
            negative_ttl_secs: defaults.negative_ttl.as_secs(),
            listing_ttl_secs: defaults.listing_ttl.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.enabled,
            ttl: Duration::from_secs(self.ttl_secs),
            negative_ttl: Duration::from_secs(self.negative_ttl_secs),
            listing_ttl: Duration::from_secs(self.listing_ttl_secs),
            ..CacheConfig::default()
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            progress: false,
        }
    }
}

/// Supported configuration file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Yaml,
    Json,
}

impl FileFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "toml, yaml or json".to_string(),
            }),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, FileFormat::from_path(path)?)
    }

    fn parse(content: &str, format: FileFormat) -> Result<Self> {
        Ok(match format {
            FileFormat::Toml => toml::from_str(content)?,
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        })
    }

    /// Load from the first default location that exists, or use defaults
    pub fn load() -> Result<Self> {
        match Self::default_config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using configuration file");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file or default locations, then apply the environment
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };
        config.merge_with_env();
        Ok(config)
    }

    /// Default configuration file paths to check, in order
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("reportsink.toml"),
            PathBuf::from("reportsink.yaml"),
            PathBuf::from("reportsink.yml"),
            PathBuf::from("reportsink.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("reportsink");
            paths.push(dir.join("config.toml"));
            paths.push(dir.join("config.yaml"));
            paths.push(dir.join("config.json"));
        }

        paths
    }

    /// Apply environment overrides for the loader path and logging
    pub fn merge_with_env(&mut self) {
        if let Ok(path) = std::env::var(LOCAL_PATH_ENV) {
            if !path.is_empty() {
                self.schema_loader.local_path = Some(PathBuf::from(path));
            }
        }
        self.logging.merge_with_env();
    }

    /// Point the loader at a local directory, as `--schemas` does
    pub fn use_schema_dir(&mut self, dir: &Path) {
        self.schema_loader.system = LoaderSystem::FileSystem;
        self.schema_loader.local_path = Some(dir.to_path_buf());
    }

    /// Check settings that deserialization alone cannot
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let loader = &self.schema_loader;

        match loader.system {
            LoaderSystem::FileSystem => match loader.local_path.as_ref() {
                Some(path) if !path.is_dir() => {
                    warnings.push(format!("Schema directory does not exist: {}", path.display()))
                }
                Some(_) => {}
                None if std::env::var(LOCAL_PATH_ENV).is_err() => {
                    return Err(Error::config(format!(
                        "schema_loader.local_path or {} must be set for the file_system loader",
                        LOCAL_PATH_ENV
                    )))
                }
                None => {}
            },
            LoaderSystem::S3 => {
                if loader.s3_bucket.as_deref().unwrap_or_default().is_empty() {
                    return Err(Error::config("schema_loader.s3_bucket must be set for the s3 loader"));
                }
            }
            LoaderSystem::BlobStorage => {
                if loader.blob_container.as_deref().unwrap_or_default().is_empty() {
                    return Err(Error::config(
                        "schema_loader.blob_container must be set for the blob_storage loader",
                    ));
                }
                if loader.blob_connection_string.is_none() {
                    return Err(Error::config(
                        "schema_loader.blob_connection_string must be set for the blob_storage loader",
                    ));
                }
            }
        }

        if self.ingest.concurrency == 0 {
            return Err(Error::config("ingest.concurrency must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            warnings.push("retry.base_delay_ms is larger than retry.max_delay_ms".to_string());
        }
        if !self.cache.enabled {
            warnings.push("Schema cache is disabled; every report reads the schema store".to_string());
        }

        Ok(warnings)
    }
}
