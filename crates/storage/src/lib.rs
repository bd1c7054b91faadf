//! Storage and caching for NDVI timelapse datasets.
//!
//! Provides:
//! - Object storage access (local directory, HTTP) for descriptors and rasters
//! - Frame loading (fetch + GeoTIFF decode)
//! - A date-keyed frame cache with coalesced loading

pub mod frame_cache;
pub mod loader;
pub mod object_store;

pub use self::object_store::{ObjectStorage, RasterSource, StorageError, StorageResult};
pub use frame_cache::{FrameCache, FrameCacheStats};
pub use loader::{load_dataset_config, FrameLoader, RasterFrameLoader};
