//! Raster-to-vector conversion for vegetation-index frames.
//!
//! - NDVI color classification (fixed seven-bucket table)
//! - Pixel footprint polygons from the dataset's affine transform
//! - Narrow projection hook for converting rings to WGS84
//! - GeoJSON output

pub mod builder;
pub mod classify;
pub mod geojson;
pub mod projection;

pub use builder::{is_nodata, pixel_ring, FeatureAttributes, Ring, VectorBuilder, VectorFeature};
pub use classify::{bucket_index, classify, ColorBucket, Rgb, NDVI_BUCKETS};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use projection::{ring_to_geographic, GeographicProjection, WebMercator, Wgs84};
