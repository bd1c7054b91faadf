//! NDVI color classification.
//!
//! Seven fixed buckets with exclusive upper bounds, ascending. A sample
//! exactly on a threshold lands in the higher bucket.

use serde::{Deserialize, Serialize};

/// An sRGB fill color, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `#rrggbb` form used in GeoJSON `fill` properties.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// One classification bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBucket {
    /// Exclusive upper bound; `None` for the open-ended top bucket
    pub upper: Option<f32>,
    pub color: Rgb,
    pub label: &'static str,
}

/// The NDVI color table, lowest bucket first.
pub const NDVI_BUCKETS: [ColorBucket; 7] = [
    ColorBucket { upper: Some(-0.2), color: Rgb(120, 30, 30), label: "water / bare" },
    ColorBucket { upper: Some(0.0), color: Rgb(160, 120, 80), label: "soil" },
    ColorBucket { upper: Some(0.2), color: Rgb(200, 180, 100), label: "sparse" },
    ColorBucket { upper: Some(0.4), color: Rgb(150, 200, 50), label: "low" },
    ColorBucket { upper: Some(0.6), color: Rgb(80, 160, 50), label: "moderate" },
    ColorBucket { upper: Some(0.8), color: Rgb(40, 120, 40), label: "dense" },
    ColorBucket { upper: None, color: Rgb(20, 80, 20), label: "very dense" },
];

/// Index into [`NDVI_BUCKETS`] for a sample.
///
/// NaN compares false against every bound and ends up in the top bucket;
/// callers filter NaN before classifying.
pub fn bucket_index(ndvi: f32) -> usize {
    NDVI_BUCKETS
        .iter()
        .position(|bucket| bucket.upper.is_some_and(|upper| ndvi < upper))
        .unwrap_or(NDVI_BUCKETS.len() - 1)
}

/// Fill color for a sample.
pub fn classify(ndvi: f32) -> Rgb {
    NDVI_BUCKETS[bucket_index(ndvi)].color
}
