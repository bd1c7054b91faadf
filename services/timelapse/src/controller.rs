//! Display of one dataset date at a time.
//!
//! `show_date` fetches (or reuses) the frame, builds its polygons, publishes
//! them and only then moves the current index. A failure anywhere leaves the
//! displayed frame and index exactly as they were.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ndvi_common::{DatasetConfig, DatasetError, DatasetResult};
use storage::FrameCache;
use vectorizer::VectorBuilder;

use crate::metrics;
use crate::prefetch::{PrefetchReport, Prefetcher};
use crate::publish::FeatureSink;

/// Per-call switches for [`DatasetController::show_date_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowOptions {
    /// Start a background prefetch batch after a successful display
    pub prefetch: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self { prefetch: true }
    }
}

/// What is currently on display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    /// `None` until the first successful display
    pub current_index: Option<usize>,
    pub current_date: Option<String>,
}

pub struct DatasetController {
    config: Arc<DatasetConfig>,
    dates: Arc<Vec<String>>,
    cache: FrameCache,
    builder: VectorBuilder,
    sink: Arc<dyn FeatureSink>,
    prefetcher: Prefetcher,
    state: Mutex<PlaybackState>,
    prefetch_tasks: std::sync::Mutex<Vec<JoinHandle<Option<PrefetchReport>>>>,
}

impl DatasetController {
    pub fn new(
        config: Arc<DatasetConfig>,
        cache: FrameCache,
        builder: VectorBuilder,
        sink: Arc<dyn FeatureSink>,
        prefetcher: Prefetcher,
    ) -> Self {
        let dates = Arc::new(config.dates.clone());
        Self {
            config,
            dates,
            cache,
            builder,
            sink,
            prefetcher,
            state: Mutex::new(PlaybackState::default()),
            prefetch_tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    /// Display the frame at `index` and warm the following ones.
    pub async fn show_date(&self, index: usize) -> DatasetResult<String> {
        self.show_date_with(index, ShowOptions::default()).await
    }

    /// Display the frame at `index`.
    ///
    /// Returns the displayed date. Concurrent calls may overlap; the
    /// display that publishes last is the one left showing.
    pub async fn show_date_with(&self, index: usize, options: ShowOptions) -> DatasetResult<String> {
        let date = self.dates.get(index).cloned().ok_or_else(|| {
            DatasetError::NotFound(format!(
                "index {} out of range for dataset '{}' ({} dates)",
                index,
                self.config.id,
                self.dates.len()
            ))
        })?;

        let was_cached = self.cache.has(&date).await;
        let frame = match self.cache.get_or_load(&date).await {
            Ok(frame) => frame,
            Err(e) => {
                metrics::record_frame_load_failure();
                warn!(dataset = %self.config.id, index = index, error = %e, "Failed to load frame");
                return Err(e.into());
            }
        };
        if !was_cached {
            metrics::record_frame_load();
        }

        let start = Instant::now();
        let builder = self.builder.clone();
        let transform = self.config.transform;
        let nodata = self.config.nodata;
        let build_date = date.clone();
        let features = tokio::task::spawn_blocking(move || builder.build(&frame, &transform, nodata, &build_date))
            .await
            .map_err(|e| DatasetError::Publish(format!("feature build task failed: {}", e)))?;
        let feature_count = features.len();
        metrics::record_build(start.elapsed(), feature_count);

        {
            // Publish and index move together
            let mut state = self.state.lock().await;
            self.sink
                .replace_all(&date, features)
                .await
                .map_err(|e| DatasetError::Publish(e.to_string()))?;
            state.current_index = Some(index);
            state.current_date = Some(date.clone());
        }

        info!(
            dataset = %self.config.id,
            date = %date,
            index = index,
            features = feature_count,
            elapsed_ms = start.elapsed().as_millis(),
            "Displayed frame"
        );

        if options.prefetch {
            self.spawn_prefetch(index);
        }

        Ok(date)
    }

    fn spawn_prefetch(&self, index: usize) {
        let prefetcher = self.prefetcher.clone();
        let dates = self.dates.clone();

        let handle = tokio::spawn(async move { prefetcher.preload_default(index, &dates).await });

        let mut tasks = match self.prefetch_tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Wait for every background prefetch started so far.
    ///
    /// Returns the reports of the batches that actually ran.
    pub async fn wait_for_prefetch(&self) -> Vec<PrefetchReport> {
        let tasks = {
            let mut tasks = match self.prefetch_tasks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *tasks)
        };

        let mut reports = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Prefetch task panicked"),
            }
        }
        debug!(batches = reports.len(), "Prefetch tasks drained");
        reports
    }

    pub async fn state(&self) -> PlaybackState {
        self.state.lock().await.clone()
    }

    pub async fn current_index(&self) -> Option<usize> {
        self.state.lock().await.current_index
    }

    pub async fn current_date(&self) -> Option<String> {
        self.state.lock().await.current_date.clone()
    }

    /// Whether a prefetch batch is running right now.
    pub fn is_prefetching(&self) -> bool {
        self.prefetcher.is_active()
    }
}
