//! Pipeline metrics reported through the `metrics` facade.
//!
//! Nothing is recorded unless a recorder is installed (the binary installs
//! the Prometheus one on request).

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use storage::FrameCacheStats;

use crate::prefetch::PrefetchReport;

/// A frame was fetched and decoded for display.
pub fn record_frame_load() {
    counter!("frame_cache_loads_total").increment(1);
}

/// A frame could not be obtained for display.
pub fn record_frame_load_failure() {
    counter!("frame_cache_load_failures_total").increment(1);
}

/// Time spent turning one frame into polygons.
pub fn record_build(duration: Duration, features: usize) {
    histogram!("frame_build_seconds").record(duration.as_secs_f64());
    gauge!("frame_features").set(features as f64);
}

/// Outcome of a finished prefetch batch.
pub fn record_prefetch(report: &PrefetchReport) {
    counter!("prefetch_batches_total").increment(1);
    counter!("prefetch_frames_failed_total").increment(report.failed as u64);
    gauge!("frame_cache_entries").set(report.cache_size as f64);
}

/// Mirror frame cache statistics into gauges.
pub fn record_cache_stats(stats: &FrameCacheStats) {
    gauge!("frame_cache_entries").set(stats.entries as f64);
    gauge!("frame_cache_hit_rate_percent").set(stats.hit_rate());
    gauge!("frame_cache_memory_bytes").set(stats.memory_bytes as f64);
    gauge!("frame_cache_coalesced_total").set(stats.coalesced as f64);
}
