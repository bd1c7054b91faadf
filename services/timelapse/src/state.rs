//! Wiring of one active dataset: storage, descriptor, cache, controller and
//! timeline.

use std::sync::Arc;
use tracing::{debug, info};

use geotiff_parser::GeoTiffDecoder;
use ndvi_common::{ConfigError, DatasetResult};
use storage::{load_dataset_config, FrameCache, ObjectStorage, RasterFrameLoader, RasterSource};
use vectorizer::VectorBuilder;

use crate::config::{PrefetchPolicy, TimelapseConfig};
use crate::controller::DatasetController;
use crate::marker::DatasetMarker;
use crate::prefetch::Prefetcher;
use crate::publish::{FeatureSink, GeoJsonSink, MemorySink};
use crate::timeline::TimelineDriver;

/// Everything needed to display one dataset.
pub struct DatasetSession {
    pub controller: Arc<DatasetController>,
    pub timeline: TimelineDriver,
    pub marker: DatasetMarker,
}

impl DatasetSession {
    /// Open the configured data root and activate the configured dataset.
    ///
    /// Frames go to GeoJSON files when an output directory is configured,
    /// otherwise to memory.
    pub async fn activate(config: &TimelapseConfig) -> DatasetResult<Self> {
        let storage = ObjectStorage::open(&config.data_root).map_err(|e| ConfigError::Unreachable {
            path: config.data_root.clone(),
            message: e.to_string(),
        })?;

        let sink: Arc<dyn FeatureSink> = match &config.output_dir {
            Some(dir) => Arc::new(GeoJsonSink::new(dir.clone())),
            None => Arc::new(MemorySink::new()),
        };

        Self::activate_with(Arc::new(storage), &config.dataset, sink, config.prefetch).await
    }

    /// Activate `dataset_id` from an explicit source and sink.
    ///
    /// Fails if the descriptor cannot be read or the dataset has no dates;
    /// no frame is loaded here.
    pub async fn activate_with(
        source: Arc<dyn RasterSource>,
        dataset_id: &str,
        sink: Arc<dyn FeatureSink>,
        policy: PrefetchPolicy,
    ) -> DatasetResult<Self> {
        let descriptor = Arc::new(load_dataset_config(source.as_ref(), dataset_id).await?);

        let loader = RasterFrameLoader::new(source.clone(), Arc::new(GeoTiffDecoder::new()), dataset_id);
        let cache = FrameCache::new(Arc::new(loader));
        let prefetcher = Prefetcher::new(cache.clone(), policy);

        let controller = Arc::new(DatasetController::new(
            descriptor.clone(),
            cache,
            VectorBuilder::default(),
            sink,
            prefetcher,
        ));
        let timeline = TimelineDriver::new(controller.clone())?;
        let marker = DatasetMarker::new(descriptor.center);

        info!(
            dataset = %descriptor.id,
            source = %source.describe(),
            dates = descriptor.dates.len(),
            prefetch_count = policy.count,
            "Dataset activated"
        );

        Ok(Self {
            controller,
            timeline,
            marker,
        })
    }

    /// Apply a map scale to the dataset marker; returns its visibility.
    pub fn set_map_scale(&mut self, scale: f64) -> bool {
        let visible = self.marker.on_scale(scale);
        debug!(scale, visible, "Map scale applied to dataset marker");
        visible
    }
}
