//! Hand-off of built features to the rendering side.
//!
//! A published set always replaces the previous one in full; sinks never
//! merge frames.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

use vectorizer::{FeatureCollection, VectorFeature};

/// Name of the GeoJSON file that always holds the displayed frame.
pub const CURRENT_FILE: &str = "current.geojson";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to write {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to serialize features: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The features of one displayed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub date: String,
    pub features: Vec<VectorFeature>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection::from_features(&self.features)
    }
}

/// Receiver of feature sets.
#[async_trait]
pub trait FeatureSink: Send + Sync {
    /// Replace everything previously published with `features`.
    async fn replace_all(&self, date: &str, features: Vec<VectorFeature>) -> Result<(), PublishError>;
}

/// Keeps the displayed feature set in memory.
#[derive(Default)]
pub struct MemorySink {
    current: RwLock<Option<Arc<FeatureSet>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published set.
    pub fn current(&self) -> Option<Arc<FeatureSet>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl FeatureSink for MemorySink {
    async fn replace_all(&self, date: &str, features: Vec<VectorFeature>) -> Result<(), PublishError> {
        let set = Arc::new(FeatureSet {
            date: date.to_string(),
            features,
        });
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(set);
        Ok(())
    }
}

/// Writes each published frame as `{date}.geojson` and mirrors it to
/// `current.geojson`.
pub struct GeoJsonSink {
    dir: PathBuf,
}

impl GeoJsonSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn frame_path(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{}.geojson", date))
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    async fn write(&self, path: PathBuf, data: &[u8]) -> Result<(), PublishError> {
        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("geojson.tmp");
        let io_err = |e: std::io::Error| PublishError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        tokio::fs::write(&tmp, data).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl FeatureSink for GeoJsonSink {
    async fn replace_all(&self, date: &str, features: Vec<VectorFeature>) -> Result<(), PublishError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PublishError::Io {
                path: self.dir.display().to_string(),
                message: e.to_string(),
            })?;

        let collection = FeatureCollection::from_features(&features);
        let data = serde_json::to_vec(&collection)?;

        self.write(self.frame_path(date), &data).await?;
        self.write(self.current_path(), &data).await?;

        debug!(date = %date, features = collection.len(), dir = %self.dir.display(), "Wrote GeoJSON frame");
        Ok(())
    }
}
