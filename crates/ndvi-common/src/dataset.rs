//! Dataset descriptor: dates, georeferencing and nodata sentinel.
//!
//! One descriptor per dataset is read from `{dataset_id}/index.json`:
//!
//! ```json
//! {
//!   "dates": ["2024-01-01", "2024-01-10"],
//!   "transform": [0.01, 0, -52.1, 0, -0.01, -29.3],
//!   "nodata": -9999,
//!   "center": { "lon": -52.0, "lat": -29.4 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::parse_timestamp;

/// Name of the descriptor document inside a dataset directory.
pub const DESCRIPTOR_FILE: &str = "index.json";

/// Affine transform from pixel (row, col) to geographic (lon, lat).
///
/// Serialized as the 6-element array
/// `[pixel_width, row_rotation, x_min, col_rotation, pixel_height, y_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct AffineTransform {
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub x_min: f64,
    pub col_rotation: f64,
    /// Usually negative: rows run north to south.
    pub pixel_height: f64,
    pub y_max: f64,
}

impl AffineTransform {
    /// Top-left corner of the pixel at (row, col). Rotation terms are ignored.
    pub fn pixel_origin(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_min + col as f64 * self.pixel_width,
            self.y_max + row as f64 * self.pixel_height,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let coefficients: [f64; 6] = (*self).into();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::invalid_field("transform", "coefficients must be finite"));
        }
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return Err(ConfigError::invalid_field("transform", "pixel size must be non-zero"));
        }
        Ok(())
    }
}

impl From<[f64; 6]> for AffineTransform {
    fn from(c: [f64; 6]) -> Self {
        Self {
            pixel_width: c[0],
            row_rotation: c[1],
            x_min: c[2],
            col_rotation: c[3],
            pixel_height: c[4],
            y_max: c[5],
        }
    }
}

impl From<AffineTransform> for [f64; 6] {
    fn from(t: AffineTransform) -> Self {
        [
            t.pixel_width,
            t.row_rotation,
            t.x_min,
            t.col_rotation,
            t.pixel_height,
            t.y_max,
        ]
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

/// Immutable descriptor for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset identifier (directory name); taken from the request, not the document
    #[serde(default)]
    pub id: String,

    /// Chronological, unique date strings
    pub dates: Vec<String>,

    pub transform: AffineTransform,

    /// Sample value marking "no valid data"
    pub nodata: f64,

    pub center: GeoPoint,
}

impl DatasetConfig {
    /// Parse and validate a descriptor document for `id`.
    pub fn from_json(id: &str, json: &str) -> Result<Self, ConfigError> {
        let mut config: DatasetConfig = serde_json::from_str(json)?;
        config.id = id.to_string();
        config.validate()?;
        Ok(config)
    }

    /// Path of the descriptor for a dataset, relative to the data root.
    pub fn descriptor_path(id: &str) -> String {
        format!("{}/{}", id, DESCRIPTOR_FILE)
    }

    /// Path of the raster asset for one date, relative to the data root.
    pub fn raster_path(&self, date: &str) -> String {
        format!("{}/{}.tif", self.id, date)
    }

    /// Position of `date` in `dates` by exact string match.
    pub fn index_of(&self, date: &str) -> Option<usize> {
        self.dates.iter().position(|d| d == date)
    }

    /// Check the invariants the pipeline relies on.
    ///
    /// An empty `dates` list is accepted here; it is reported as a
    /// not-found condition when the timeline is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::invalid_field("id", "must not be empty"));
        }

        self.transform.validate()?;

        if !self.center.lon.is_finite() || !self.center.lat.is_finite() {
            return Err(ConfigError::invalid_field("center", "coordinates must be finite"));
        }

        let mut previous = None;
        for date in &self.dates {
            let t = parse_timestamp(date)
                .map_err(|e| ConfigError::invalid_field("dates", e.to_string()))?;
            if let Some(prev) = previous {
                if t <= prev {
                    return Err(ConfigError::invalid_field(
                        "dates",
                        format!("'{}' is not strictly after the previous date", date),
                    ));
                }
            }
            previous = Some(t);
        }

        Ok(())
    }
}
