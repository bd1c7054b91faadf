//! Test data generators for synthetic vegetation-index rasters.
//!
//! These generators create predictable, verifiable sample patterns
//! that can be used across the test suite.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Creates an NDVI grid sweeping from -1.0 (top-left) to 1.0 (bottom-right).
///
/// Values are spread evenly over the pixels in row-major order, so every
/// color bucket is represented once the grid has a few dozen pixels.
///
/// # Example
///
/// ```
/// use test_utils::create_ndvi_ramp;
///
/// let grid = create_ndvi_ramp(5, 2);
/// assert_eq!(grid.len(), 10);
/// assert_eq!(grid[0], -1.0);
/// assert_eq!(grid[9], 1.0);
/// ```
pub fn create_ndvi_ramp(width: usize, height: usize) -> Vec<f32> {
    let n = width * height;
    if n <= 1 {
        return vec![-1.0; n];
    }
    (0..n)
        .map(|i| -1.0 + 2.0 * i as f32 / (n - 1) as f32)
        .collect()
}

/// Creates an EVI grid derived from an NDVI grid (`evi = ndvi * 0.8`).
///
/// Keeps the two bands distinguishable in attribute assertions.
pub fn create_evi_from_ndvi(ndvi: &[f32]) -> Vec<f32> {
    ndvi.iter().map(|v| v * 0.8).collect()
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with NaN values at specified positions.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `fill` - Value for every other pixel
/// * `nan_positions` - List of (col, row) positions that should be NaN
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    fill: f32,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![fill; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// How [`encode_bands_tiff`] lays out samples on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiffLayout {
    /// Band-sequential (`PlanarConfiguration = 2`) instead of interleaved
    pub planar: bool,
    /// Rows per strip; `0` writes the whole image as one strip
    pub rows_per_strip: u32,
    /// Deflate-compress every strip
    pub deflate: bool,
}

/// Encodes NDVI and EVI as a two-sample `MinIsBlack` float32 TIFF, interleaved.
///
/// This is the layout GDAL writes for a 2-band float raster.
///
/// # Panics
///
/// Panics if the band lengths differ from `width * height`.
pub fn encode_ndvi_tiff(width: u32, height: u32, ndvi: &[f32], evi: &[f32]) -> Vec<u8> {
    encode_bands_tiff(width, height, &[ndvi, evi], TiffLayout::default())
}

/// Encodes NDVI and EVI band-sequentially (`interleave='band'` in rasterio).
pub fn encode_ndvi_tiff_planar(width: u32, height: u32, ndvi: &[f32], evi: &[f32]) -> Vec<u8> {
    let layout = TiffLayout {
        planar: true,
        ..TiffLayout::default()
    };
    encode_bands_tiff(width, height, &[ndvi, evi], layout)
}

/// Encodes a single-band float TIFF (missing the EVI band).
pub fn encode_single_band_tiff(width: u32, height: u32, values: &[f32]) -> Vec<u8> {
    encode_bands_tiff(width, height, &[values], TiffLayout::default())
}

/// Encodes any number of float32 bands as a little-endian `MinIsBlack` TIFF.
///
/// Strip data follows the header and the IFD comes last, so a truncated
/// file loses its directory first.
///
/// # Panics
///
/// Panics if any band length differs from `width * height`.
pub fn encode_bands_tiff(width: u32, height: u32, bands: &[&[f32]], layout: TiffLayout) -> Vec<u8> {
    let pixels = (width * height) as usize;
    for (i, band) in bands.iter().enumerate() {
        assert_eq!(band.len(), pixels, "band {} length", i);
    }
    let samples = bands.len() as u16;
    let rows_per_strip = match layout.rows_per_strip {
        0 => height.max(1),
        rows => rows.min(height.max(1)),
    };

    let mut strips: Vec<Vec<u8>> = Vec::new();
    let planes: Vec<Vec<&[f32]>> = if layout.planar {
        bands.iter().map(|band| vec![*band]).collect()
    } else {
        vec![bands.to_vec()]
    };
    for plane in &planes {
        for row0 in (0..height).step_by(rows_per_strip as usize) {
            let row_end = (row0 + rows_per_strip).min(height);
            let mut raw = Vec::new();
            for pixel in (row0 * width) as usize..(row_end * width) as usize {
                for band in plane {
                    raw.extend_from_slice(&band[pixel].to_le_bytes());
                }
            }
            strips.push(if layout.deflate { deflate(&raw) } else { raw });
        }
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    let mut offsets = Vec::with_capacity(strips.len());
    let mut counts = Vec::with_capacity(strips.len());
    for strip in &strips {
        offsets.push(out.len() as u32);
        counts.push(strip.len() as u32);
        out.extend_from_slice(strip);
    }
    if out.len() % 2 == 1 {
        out.push(0);
    }

    let per_sample = |value: u16| vec![value; samples as usize];
    let entries = vec![
        IfdEntry::long(256, &[width]),
        IfdEntry::long(257, &[height]),
        IfdEntry::short(258, &per_sample(32)),
        IfdEntry::short(259, &[if layout.deflate { 8 } else { 1 }]),
        IfdEntry::short(262, &[1]),
        IfdEntry::long(273, &offsets),
        IfdEntry::short(277, &[samples]),
        IfdEntry::long(278, &[rows_per_strip]),
        IfdEntry::long(279, &counts),
        IfdEntry::short(284, &[if layout.planar { 2 } else { 1 }]),
        IfdEntry::short(339, &per_sample(3)),
    ];
    write_ifd(&mut out, &entries);
    out
}

fn deflate(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(raw).expect("deflate strip");
    encoder.finish().expect("finish deflate stream")
}

struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    data: Vec<u8>,
}

impl IfdEntry {
    fn short(tag: u16, values: &[u16]) -> Self {
        Self {
            tag,
            field_type: 3,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn long(tag: u16, values: &[u32]) -> Self {
        Self {
            tag,
            field_type: 4,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }
}

/// Append the IFD (entries sorted by tag) and point the header at it.
fn write_ifd(out: &mut Vec<u8>, entries: &[IfdEntry]) {
    let ifd_offset = out.len() as u32;
    out[4..8].copy_from_slice(&ifd_offset.to_le_bytes());

    let mut overflow_offset = ifd_offset as usize + 2 + entries.len() * 12 + 4;
    let mut overflow = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&(overflow_offset as u32).to_le_bytes());
            overflow.extend_from_slice(&entry.data);
            overflow_offset += entry.data.len();
            if overflow_offset % 2 == 1 {
                overflow.push(0);
                overflow_offset += 1;
            }
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&overflow);
}
