//! Fetch-and-decode of dataset descriptors and per-date rasters.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use geotiff_parser::RasterDecoder;
use ndvi_common::{ConfigError, DatasetConfig, DecodeError, Frame, LoadError};

use crate::object_store::RasterSource;

/// Produces the decoded frame for one date of a dataset.
///
/// The frame cache calls this at most once per uncached date at a time.
#[async_trait]
pub trait FrameLoader: Send + Sync {
    async fn load(&self, date: &str) -> Result<Frame, LoadError>;
}

/// Loader reading `{dataset_id}/{date}.tif` from a source and decoding it.
pub struct RasterFrameLoader {
    source: Arc<dyn RasterSource>,
    decoder: Arc<dyn RasterDecoder>,
    dataset_id: String,
}

impl RasterFrameLoader {
    pub fn new(
        source: Arc<dyn RasterSource>,
        decoder: Arc<dyn RasterDecoder>,
        dataset_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            decoder,
            dataset_id: dataset_id.into(),
        }
    }

    fn raster_path(&self, date: &str) -> String {
        format!("{}/{}.tif", self.dataset_id, date)
    }
}

#[async_trait]
impl FrameLoader for RasterFrameLoader {
    async fn load(&self, date: &str) -> Result<Frame, LoadError> {
        let path = self.raster_path(date);
        let start = Instant::now();

        let bytes = self
            .source
            .get(&path)
            .await
            .map_err(|e| LoadError::transport(date, &path, e.to_string()))?;
        let fetch_ms = start.elapsed().as_millis();

        // Decoding is CPU-bound; keep it off the async workers.
        let decoder = self.decoder.clone();
        let frame = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| {
                LoadError::decode(date, DecodeError::Malformed(format!("decoder task failed: {}", e)))
            })?
            .map_err(|e| LoadError::decode(date, e))?;

        debug!(
            date = %date,
            width = frame.width(),
            height = frame.height(),
            fetch_ms = fetch_ms,
            total_ms = start.elapsed().as_millis(),
            "Loaded frame"
        );

        Ok(frame)
    }
}

/// Read and validate the descriptor of dataset `id`.
///
/// Any failure here is fatal for the dataset.
pub async fn load_dataset_config(source: &dyn RasterSource, id: &str) -> Result<DatasetConfig, ConfigError> {
    let path = DatasetConfig::descriptor_path(id);

    let bytes = source.get(&path).await.map_err(|e| ConfigError::Unreachable {
        path: format!("{}/{}", source.describe(), path),
        message: e.to_string(),
    })?;

    let json = std::str::from_utf8(&bytes)
        .map_err(|e| ConfigError::Malformed(format!("descriptor is not UTF-8: {}", e)))?;

    let config = DatasetConfig::from_json(id, json)?;

    info!(
        dataset = %config.id,
        dates = config.dates.len(),
        nodata = config.nodata,
        "Loaded dataset descriptor"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::ObjectStorage;
    use bytes::Bytes;
    use geotiff_parser::GeoTiffDecoder;
    use test_utils::{descriptor_json, encode_ndvi_tiff, encode_ndvi_tiff_planar, fixtures};

    async fn storage_with(path: &str, data: Vec<u8>) -> Arc<ObjectStorage> {
        let storage = ObjectStorage::in_memory();
        storage.put(path, Bytes::from(data)).await.unwrap();
        Arc::new(storage)
    }

    #[tokio::test]
    async fn test_load_frame() {
        let tiff = encode_ndvi_tiff(3, 2, &[0.5; 6], &[0.25; 6]);
        let storage = storage_with("farm/2024-01-01.tif", tiff).await;
        let loader = RasterFrameLoader::new(storage, Arc::new(GeoTiffDecoder::new()), "farm");

        let frame = loader.load("2024-01-01").await.unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.evi()[5], 0.25);
    }

    #[tokio::test]
    async fn test_load_band_sequential_frame() {
        let tiff = encode_ndvi_tiff_planar(2, 2, &[0.1, 0.2, 0.3, 0.4], &[0.5, 0.6, 0.7, 0.8]);
        let storage = storage_with("farm/2024-01-01.tif", tiff).await;
        let loader = RasterFrameLoader::new(storage, Arc::new(GeoTiffDecoder::new()), "farm");

        let frame = loader.load("2024-01-01").await.unwrap();
        assert_eq!(frame.ndvi(), &[0.1f32, 0.2, 0.3, 0.4]);
        assert_eq!(frame.evi(), &[0.5f32, 0.6, 0.7, 0.8]);
    }

    #[tokio::test]
    async fn test_missing_raster_is_transport_error() {
        let storage = Arc::new(ObjectStorage::in_memory());
        let loader = RasterFrameLoader::new(storage, Arc::new(GeoTiffDecoder::new()), "farm");

        let err = loader.load("2024-01-01").await.unwrap_err();
        assert!(matches!(err, LoadError::Transport { ref path, .. } if path == "farm/2024-01-01.tif"));
    }

    #[tokio::test]
    async fn test_corrupt_raster_is_decode_error() {
        let storage = storage_with("farm/2024-01-01.tif", b"not a tiff".to_vec()).await;
        let loader = RasterFrameLoader::new(storage, Arc::new(GeoTiffDecoder::new()), "farm");

        assert!(matches!(
            loader.load("2024-01-01").await,
            Err(LoadError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_dataset_config() {
        let json = descriptor_json(
            &fixtures::dates::SPARSE_JANUARY,
            fixtures::transforms::HUNDREDTH_DEGREE,
            fixtures::NODATA,
        );
        let storage = storage_with("farm/index.json", json.into_bytes()).await;

        let config = load_dataset_config(storage.as_ref(), "farm").await.unwrap();
        assert_eq!(config.id, "farm");
        assert_eq!(config.dates.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_unreachable() {
        let storage = ObjectStorage::in_memory();
        assert!(matches!(
            load_dataset_config(&storage, "farm").await,
            Err(ConfigError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_descriptor() {
        let storage = storage_with("farm/index.json", b"{\"dates\": 3}".to_vec()).await;
        assert!(matches!(
            load_dataset_config(storage.as_ref(), "farm").await,
            Err(ConfigError::Malformed(_))
        ));
    }
}
