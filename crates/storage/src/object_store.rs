//! Object storage interface for dataset assets (local directory or HTTP).

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    http::HttpBuilder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while reading dataset assets.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage location '{location}': {message}")]
    InvalidLocation { location: String, message: String },

    #[error("Storage error: {0}")]
    Backend(String),
}

/// Read access to dataset assets by relative path.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Read the full object at `path` (e.g. `farm/2024-01-01.tif`).
    async fn get(&self, path: &str) -> StorageResult<Bytes>;

    /// Human-readable description of where objects come from.
    fn describe(&self) -> String;
}

/// `RasterSource` backed by an `object_store` implementation.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    location: String,
}

impl ObjectStorage {
    /// Open a storage location: `http://`/`https://` URLs use the HTTP
    /// store, anything else is treated as a local directory.
    pub fn open(location: &str) -> StorageResult<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::http(location)
        } else {
            Self::local(location)
        }
    }

    /// Serve objects from a local directory.
    pub fn local(root: &str) -> StorageResult<Self> {
        let store = LocalFileSystem::new_with_prefix(root).map_err(|e| StorageError::InvalidLocation {
            location: root.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            store: Arc::new(store),
            location: root.to_string(),
        })
    }

    /// Serve objects from an HTTP base URL.
    pub fn http(base_url: &str) -> StorageResult<Self> {
        let store = HttpBuilder::new()
            .with_url(base_url)
            .build()
            .map_err(|e| StorageError::InvalidLocation {
                location: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            store: Arc::new(store),
            location: base_url.to_string(),
        })
    }

    /// Volatile in-process store, mostly for tests and demos.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            location: "memory://".to_string(),
        }
    }

    /// Write bytes to a path.
    #[instrument(skip(self, data), fields(location = %self.location, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Backend(format!(
                "Failed to check {}: {}",
                path, e
            ))),
        }
    }
}

#[async_trait]
impl RasterSource for ObjectStorage {
    #[instrument(skip(self), fields(location = %self.location, path = %path))]
    async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::Backend(format!("Failed to read {}: {}", path, other)),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let storage = ObjectStorage::in_memory();
        storage
            .put("farm/index.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert!(storage.exists("farm/index.json").await.unwrap());
        assert_eq!(storage.get("farm/index.json").await.unwrap().as_ref(), b"{}");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let storage = ObjectStorage::in_memory();
        assert!(!storage.exists("farm/2024-01-01.tif").await.unwrap());
        assert!(matches!(
            storage.get("farm/2024-01-01.tif").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("farm")).unwrap();
        std::fs::write(dir.path().join("farm/2024-01-01.tif"), b"raster").unwrap();

        let storage = ObjectStorage::open(dir.path().to_str().unwrap()).unwrap();
        let bytes = storage.get("farm/2024-01-01.tif").await.unwrap();
        assert_eq!(bytes.as_ref(), b"raster");
    }

    #[test]
    fn test_missing_local_root_is_invalid() {
        assert!(matches!(
            ObjectStorage::open("/definitely/not/a/dataset/root"),
            Err(StorageError::InvalidLocation { .. })
        ));
    }
}
