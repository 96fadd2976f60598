//! Configuration-driven loader construction
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::{LoaderError, LoaderResult};
use crate::loader::fs::{FileSystemLoader, LOCAL_PATH_ENV};
use crate::loader::object_store::{HttpObjectStore, ObjectStoreLoader, ObjectStoreProvider};
use crate::loader::SchemaLoader;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Backing system for report schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum LoaderSystem {
    #[default]
    FileSystem,
    S3,
    BlobStorage,
}

impl LoaderSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileSystem => "file_system",
            Self::S3 => "s3",
            Self::BlobStorage => "blob_storage",
        }
    }
}

impl TryFrom<String> for LoaderSystem {
    type Error = LoaderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for LoaderSystem {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file_system" | "filesystem" | "local" => Ok(Self::FileSystem),
            "s3" => Ok(Self::S3),
            "blob_storage" | "blob" => Ok(Self::BlobStorage),
            other => Err(LoaderError::UnsupportedSystem {
                system: other.to_string(),
            }),
        }
    }
}

/// Settings for the schema loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaLoaderConfig {
    pub system: LoaderSystem,

    /// Directory for the file system loader, falls back to `REPORT_SCHEMA_LOCAL_FILE_SYSTEM_PATH`
    pub local_path: Option<PathBuf>,

    pub s3_bucket: Option<String>,
    pub s3_region: String,

    pub blob_container: Option<String>,
    pub blob_connection_string: Option<String>,

    /// Override for the object store base URL, mostly for S3-compatible or emulated stores
    pub endpoint: Option<String>,

    pub timeout_secs: u64,
}

impl Default for SchemaLoaderConfig {
    fn default() -> Self {
        Self {
            system: LoaderSystem::FileSystem,
            local_path: None,
            s3_bucket: None,
            s3_region: "us-east-1".to_string(),
            blob_container: None,
            blob_connection_string: None,
            endpoint: None,
            timeout_secs: HttpObjectStore::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SchemaLoaderConfig {
    /// Where schemas are read from, for display
    pub fn location(&self) -> String {
        match self.system {
            LoaderSystem::FileSystem => self
                .local_path
                .as_ref()
                .map(|p| p.display().to_string())
                .or_else(|| std::env::var(LOCAL_PATH_ENV).ok())
                .unwrap_or_default(),
            LoaderSystem::S3 => self.s3_bucket.clone().unwrap_or_default(),
            LoaderSystem::BlobStorage => self.blob_container.clone().unwrap_or_default(),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Construct the loader described by `config`.
///
/// The result is not cached; wrap it in a
/// [`CachedSchemaLoader`](crate::loader::CachedSchemaLoader) for production use.
pub fn build_loader(config: &SchemaLoaderConfig) -> LoaderResult<Box<dyn SchemaLoader>> {
    match config.system {
        LoaderSystem::FileSystem => {
            let loader = match &config.local_path {
                Some(path) => FileSystemLoader::new(path),
                None => FileSystemLoader::from_env()?,
            };
            info!(root = %loader.root().display(), "Using file system schema loader");
            Ok(Box::new(loader))
        }
        LoaderSystem::S3 => {
            let bucket = required(&config.s3_bucket, "s3_bucket")?;
            let base_url = config
                .endpoint
                .clone()
                .unwrap_or_else(|| s3_endpoint(bucket, &config.s3_region));
            let transport = HttpObjectStore::with_timeout(base_url, config.timeout())?;
            info!(bucket, region = %config.s3_region, "Using S3 schema loader");
            Ok(Box::new(ObjectStoreLoader::new(
                ObjectStoreProvider::s3(bucket, config.s3_region.as_str()),
                transport,
            )))
        }
        LoaderSystem::BlobStorage => {
            let container = required(&config.blob_container, "blob_container")?;
            let connection = ConnectionString::parse(required(
                &config.blob_connection_string,
                "blob_connection_string",
            )?)?;
            let base_url = match &config.endpoint {
                Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), container),
                None => connection.container_url(container),
            };
            let mut transport = HttpObjectStore::with_timeout(base_url, config.timeout())?;
            if let Some(sas) = connection.shared_access_signature {
                transport = transport.with_query(sas);
            }
            info!(container, account = %connection.account_name, "Using blob storage schema loader");
            Ok(Box::new(ObjectStoreLoader::new(
                ObjectStoreProvider::blob(container),
                transport,
            )))
        }
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> LoaderResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LoaderError::configuration(format!("'{}' is required for this loader system", field)))
}

fn s3_endpoint(bucket: &str, region: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com", bucket, region)
}

/// The parts of a storage account connection string the loader needs
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectionString {
    protocol: String,
    account_name: String,
    endpoint_suffix: String,
    blob_endpoint: Option<String>,
    shared_access_signature: Option<String>,
}

impl ConnectionString {
    fn parse(raw: &str) -> LoaderResult<Self> {
        let mut protocol = "https".to_string();
        let mut account_name = None;
        let mut endpoint_suffix = "core.windows.net".to_string();
        let mut blob_endpoint = None;
        let mut shared_access_signature = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key {
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "AccountName" => account_name = Some(value.to_string()),
                "EndpointSuffix" => endpoint_suffix = value.to_string(),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                "SharedAccessSignature" => shared_access_signature = Some(value.to_string()),
                _ => {}
            }
        }

        let account_name = match (account_name, &blob_endpoint) {
            (Some(name), _) => name,
            (None, Some(_)) => String::new(),
            (None, None) => {
                return Err(LoaderError::configuration(
                    "blob connection string has neither AccountName nor BlobEndpoint",
                ))
            }
        };

        Ok(Self {
            protocol,
            account_name,
            endpoint_suffix,
            blob_endpoint,
            shared_access_signature,
        })
    }

    fn container_url(&self, container: &str) -> String {
        match &self.blob_endpoint {
            Some(endpoint) => format!("{}/{}", endpoint, container),
            None => format!(
                "{}://{}.blob.{}/{}",
                self.protocol, self.account_name, self.endpoint_suffix, container
            ),
        }
    }
}
