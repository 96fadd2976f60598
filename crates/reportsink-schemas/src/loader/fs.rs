//! Schema loader backed by a local directory
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::{LoaderError, LoaderResult};
use crate::loader::SchemaLoader;
use crate::schema_file::{content_schema_file_name, ReportSchemaMetadata, SchemaFile, SchemaLoaderInfo};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the local schema directory
pub const LOCAL_PATH_ENV: &str = "REPORT_SCHEMA_LOCAL_FILE_SYSTEM_PATH";

/// Loads schema files from a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a loader for the directory named by `REPORT_SCHEMA_LOCAL_FILE_SYSTEM_PATH`
    pub fn from_env() -> LoaderResult<Self> {
        std::env::var(LOCAL_PATH_ENV)
            .map(Self::new)
            .map_err(|_| LoaderError::configuration("Local file system path is not configured"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file name inside the root, refusing anything that could escape it
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let escapes = filename.is_empty()
            || filename == "."
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\');
        if escapes {
            None
        } else {
            Some(self.root.join(filename))
        }
    }

    fn checked_path(&self, filename: &str) -> LoaderResult<PathBuf> {
        self.resolve(filename).ok_or_else(|| {
            LoaderError::invalid_schema(filename, "schema file names must be plain file names")
        })
    }
}

impl SchemaLoader for FileSystemLoader {
    fn load_schema_file(&self, filename: &str) -> LoaderResult<SchemaFile> {
        let Some(path) = self.resolve(filename) else {
            warn!(schema_file = filename, "Refusing to resolve schema file name outside the schema directory");
            return Ok(SchemaFile::missing(filename));
        };

        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!(schema_file = filename, bytes = bytes.len(), "Loaded schema file from disk");
                Ok(SchemaFile::found(filename, bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SchemaFile::missing(filename)),
            Err(e) => Err(LoaderError::io_error(path, e)),
        }
    }

    fn schema_files(&self) -> LoaderResult<Vec<ReportSchemaMetadata>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| LoaderError::io_error(&self.root, e))?;

        let mut schemas = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| LoaderError::io_error(&self.root, e))?.path();
            let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
            if !path.is_file() || !is_json {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let content = std::fs::read(&path).map_err(|e| LoaderError::io_error(&path, e))?;
            schemas.push(ReportSchemaMetadata::from_content(filename, &content));
        }

        schemas.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(schemas)
    }

    fn info(&self) -> SchemaLoaderInfo {
        SchemaLoaderInfo::new("file_system", self.root.display().to_string())
    }

    fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> LoaderResult<String> {
        let filename = content_schema_file_name(schema_name, schema_version);
        let path = self.checked_path(&filename)?;

        std::fs::create_dir_all(&self.root).map_err(|e| LoaderError::io_error(&self.root, e))?;
        std::fs::write(&path, content).map_err(|e| LoaderError::io_error(&path, e))?;
        debug!(schema_file = %filename, "Wrote schema file");
        Ok(filename)
    }

    fn remove_schema(&self, schema_name: &str, schema_version: &str) -> LoaderResult<String> {
        let filename = content_schema_file_name(schema_name, schema_version);
        let path = self.checked_path(&filename)?;

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(filename),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LoaderError::schema_not_found(filename)),
            Err(e) => Err(LoaderError::io_error(path, e)),
        }
    }
}
