//! Raster-to-polygon conversion.
//!
//! Every valid pixel becomes one closed 5-point ring covering the pixel's
//! footprint, filled with its NDVI bucket color.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ndvi_common::{AffineTransform, Frame};

use crate::classify::{classify, Rgb};
use crate::projection::{ring_to_geographic, GeographicProjection, Wgs84};

/// Closed ring: four corners plus the first corner repeated.
pub type Ring = [[f64; 2]; 5];

/// Per-pixel attributes carried alongside the polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttributes {
    pub ndvi: f32,
    /// Secondary index at the same pixel; may itself be nodata or NaN
    pub evi: f32,
    pub date: String,
    pub row: usize,
    pub col: usize,
}

/// One pixel polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorFeature {
    pub ring: Ring,
    pub color: Rgb,
    pub attributes: FeatureAttributes,
}

/// Whether a sample carries no usable value.
///
/// The sentinel is compared at sample precision so that a descriptor value
/// like `-3.4e38` still matches the `f32` stored in the raster.
pub fn is_nodata(sample: f32, nodata: f64) -> bool {
    sample.is_nan() || sample == nodata as f32
}

/// Geographic footprint of pixel (row, col).
pub fn pixel_ring(transform: &AffineTransform, row: usize, col: usize) -> Ring {
    let (lon, lat) = transform.pixel_origin(row, col);
    let pw = transform.pixel_width;
    let ph = transform.pixel_height;
    [
        [lon, lat],
        [lon + pw, lat],
        [lon + pw, lat + ph],
        [lon, lat + ph],
        [lon, lat],
    ]
}

/// Converts decoded frames into classified pixel polygons.
#[derive(Clone)]
pub struct VectorBuilder {
    projection: Arc<dyn GeographicProjection>,
}

impl Default for VectorBuilder {
    fn default() -> Self {
        Self::new(Arc::new(Wgs84))
    }
}

impl VectorBuilder {
    pub fn new(projection: Arc<dyn GeographicProjection>) -> Self {
        Self { projection }
    }

    /// Build one feature per valid pixel, in row-major order.
    ///
    /// Pixels whose NDVI is NaN or equals `nodata` are skipped. Rows are
    /// processed in parallel; output order does not depend on scheduling.
    pub fn build(&self, frame: &Frame, transform: &AffineTransform, nodata: f64, date: &str) -> Vec<VectorFeature> {
        let width = frame.width();
        let ndvi = frame.ndvi();
        let evi = frame.evi();

        (0..frame.height())
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..width).filter_map(move |col| {
                    let index = row * width + col;
                    let value = ndvi[index];
                    if is_nodata(value, nodata) {
                        return None;
                    }

                    let mut ring = pixel_ring(transform, row, col);
                    ring_to_geographic(self.projection.as_ref(), &mut ring);

                    Some(VectorFeature {
                        ring,
                        color: classify(value),
                        attributes: FeatureAttributes {
                            ndvi: value,
                            evi: evi[index],
                            date: date.to_string(),
                            row,
                            col,
                        },
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_nodata() {
        assert!(is_nodata(f32::NAN, -9999.0));
        assert!(is_nodata(-9999.0, -9999.0));
        assert!(is_nodata(f32::MIN, f32::MIN as f64));
        assert!(!is_nodata(0.0, -9999.0));
    }

    #[test]
    fn test_pixel_ring_is_closed() {
        let t = AffineTransform::from([1.0, 0.0, 10.0, 0.0, -1.0, 50.0]);
        let ring = pixel_ring(&t, 0, 0);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(ring[2], [11.0, 49.0]);
    }

    #[test]
    fn test_empty_frame_builds_nothing() {
        let frame = Frame::new(Vec::new(), Vec::new(), 0, 0).unwrap();
        let t = AffineTransform::from([1.0, 0.0, 0.0, 0.0, -1.0, 0.0]);
        assert!(VectorBuilder::default().build(&frame, &t, -9999.0, "2024-01-01").is_empty());
    }
}
