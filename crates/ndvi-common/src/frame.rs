//! Decoded raster for a single date.

use crate::error::DecodeError;

/// Band index of the primary vegetation index.
pub const NDVI_BAND: usize = 0;
/// Band index of the secondary (enhanced) vegetation index.
pub const EVI_BAND: usize = 1;

/// Decoded NDVI/EVI samples for one date, row-major.
///
/// Immutable once built; shared as `Arc<Frame>` by the frame cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    ndvi: Vec<f32>,
    evi: Vec<f32>,
    width: usize,
    height: usize,
}

impl Frame {
    /// Build a frame, checking that both bands cover `width * height` samples.
    pub fn new(ndvi: Vec<f32>, evi: Vec<f32>, width: usize, height: usize) -> Result<Self, DecodeError> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| DecodeError::Malformed(format!("dimensions {}x{} overflow", width, height)))?;

        for band in [&ndvi, &evi] {
            if band.len() != expected {
                return Err(DecodeError::LengthMismatch {
                    width,
                    height,
                    actual: band.len(),
                });
            }
        }

        Ok(Self {
            ndvi,
            evi,
            width,
            height,
        })
    }

    pub fn ndvi(&self) -> &[f32] {
        &self.ndvi
    }

    pub fn evi(&self) -> &[f32] {
        &self.evi
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.ndvi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ndvi.is_empty()
    }

    /// Approximate heap size of the sample data.
    pub fn size_bytes(&self) -> usize {
        (self.ndvi.len() + self.evi.len()) * std::mem::size_of::<f32>()
    }
}
