//! Common types and utilities shared across the NDVI timelapse crates.

pub mod dataset;
pub mod error;
pub mod frame;
pub mod time;

pub use dataset::{AffineTransform, DatasetConfig, GeoPoint, DESCRIPTOR_FILE};
pub use error::{ConfigError, DatasetError, DatasetResult, DecodeError, LoadError};
pub use frame::{Frame, EVI_BAND, NDVI_BAND};
pub use time::{date_key, nearest_index, parse_timestamp, TimeParseError};
