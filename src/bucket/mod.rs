//! Bucket uploader
//!
//! Pushes local output files into the object-store destination. Keys are
//! addressed directly, so overwrite is last-write-wins and no duplicate
//! check is needed.

use crate::error::{Error, Result};
use bytes::Bytes;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;

/// Object-store destination parsed from the configured URL
#[derive(Debug, Clone)]
pub struct BucketStore {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Key prefix within the bucket
    prefix: String,
    /// URL scheme for logging
    scheme: String,
}

impl BucketStore {
    /// Parse a destination URL and create the matching object store.
    ///
    /// Supported formats:
    /// - `gs://bucket/prefix/` - Google Cloud Storage (credentials from env)
    /// - `/local/path/` - local filesystem, used in tests
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else {
            Self::parse_local(url)
        }
    }

    fn parse_gcs(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("gs://")
            .ok_or_else(|| Error::config(format!("Invalid GCS URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].to_string(),
            ),
            None => (without_scheme, String::new()),
        };

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "gs".to_string(),
        })
    }

    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// The URL scheme (gs, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Upload raw bytes at a key, overwriting any existing object
    pub async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        let path = if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix.trim_end_matches('/')))
        };

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::bucket(format!("failed to write {path}: {e}")))?;

        Ok(format!("{}://{path}", self.scheme))
    }

    /// Upload a local file's bytes at a key
    pub async fn upload_file(&self, local: &Path, key: &str) -> Result<String> {
        let data = tokio::fs::read(local).await.map_err(|e| {
            Error::bucket(format!("failed to read {}: {e}", local.display()))
        })?;
        self.put(key, Bytes::from(data)).await
    }
}
