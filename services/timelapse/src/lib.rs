//! NDVI timelapse service library.
//!
//! Drives a dataset's timeline: frames are loaded through a shared cache,
//! turned into classified pixel polygons and handed to a feature sink while
//! upcoming frames are warmed in the background.

pub mod config;
pub mod controller;
pub mod marker;
pub mod metrics;
pub mod prefetch;
pub mod publish;
pub mod roi;
pub mod state;
pub mod timeline;

pub use config::{PrefetchPolicy, TimelapseConfig};
pub use controller::{DatasetController, PlaybackState, ShowOptions};
pub use marker::DatasetMarker;
pub use prefetch::{PrefetchReport, Prefetcher};
pub use publish::{FeatureSet, FeatureSink, GeoJsonSink, MemorySink, PublishError};
pub use roi::{export_region, RoiError};
pub use state::DatasetSession;
pub use timeline::{PlaybackSummary, TimelineDriver};
