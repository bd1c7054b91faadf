//! GeoTIFF raster decoding for vegetation-index time series.
//!
//! Each dataset date is stored as one multi-band GeoTIFF: band 0 holds
//! NDVI, band 1 holds EVI. Georeferencing comes from the dataset
//! descriptor, so only the sample grid is read here.
//!
//! # Supported layouts
//!
//! - 2 or more samples per pixel under any photometric tag (GDAL and
//!   rasterio write `MinIsBlack` for multi-band float rasters)
//! - Chunky (pixel-interleaved) or planar (band-sequential) configuration
//! - Integer (8/16/32/64-bit, signed or unsigned) or float (32/64-bit)
//!   samples, converted to `f32`, in either byte order
//! - Strips or tiles, uncompressed, Deflate, LZW or PackBits, with the
//!   horizontal or floating point predictor

mod decoder;

pub use decoder::GeoTiffDecoder;
pub use ndvi_common::{DecodeError, Frame};

/// Turns the raw bytes of one raster asset into a [`Frame`].
///
/// Implementations must be cheap to share across tasks; decoding itself is
/// synchronous and may be moved onto a blocking thread by the caller.
pub trait RasterDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, DecodeError>;
}
