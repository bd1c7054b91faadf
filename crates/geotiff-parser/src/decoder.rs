use std::io::{Cursor, Read, Seek};

use flate2::read::ZlibDecoder;
use tiff::decoder::{fp_predict_f32, fp_predict_f64, ChunkType, Decoder, Limits};
use tiff::tags::Tag;
use tiff::TiffError;
use tracing::debug;
use weezl::{decode::Decoder as LzwDecoder, BitOrder};

use ndvi_common::{DecodeError, Frame, EVI_BAND, NDVI_BAND};

use crate::RasterDecoder;

/// Minimum number of bands a vegetation raster must carry.
const REQUIRED_BANDS: usize = 2;

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_LZW: u16 = 5;
const COMPRESSION_DEFLATE: u16 = 8;
const COMPRESSION_PACKBITS: u16 = 32773;
const COMPRESSION_DEFLATE_LEGACY: u16 = 32946;

const PREDICTOR_NONE: u16 = 1;
const PREDICTOR_HORIZONTAL: u16 = 2;
const PREDICTOR_FLOAT: u16 = 3;

/// Decoder for NDVI/EVI GeoTIFF assets.
///
/// The `tiff` crate parses the header and IFD; strips and tiles are read
/// here so that any photometric tag, sample count and planar layout work.
#[derive(Debug, Clone)]
pub struct GeoTiffDecoder {
    /// Upper bound on the decoded buffer, in bytes
    max_buffer_bytes: usize,
}

impl Default for GeoTiffDecoder {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 512 * 1024 * 1024,
        }
    }
}

impl GeoTiffDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the size of a single decoded image.
    pub fn with_max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes;
        self
    }
}

impl RasterDecoder for GeoTiffDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, DecodeError> {
        let layout = RasterLayout::read(bytes, self.max_buffer_bytes)?;

        if layout.samples < REQUIRED_BANDS {
            return Err(DecodeError::MissingBands {
                found: layout.samples,
                required: REQUIRED_BANDS,
            });
        }

        let decoded_bytes = layout.width * layout.height * layout.samples * std::mem::size_of::<f32>();
        if decoded_bytes > self.max_buffer_bytes {
            return Err(DecodeError::Malformed(format!(
                "decoded raster needs {} bytes, limit is {}",
                decoded_bytes, self.max_buffer_bytes
            )));
        }

        let mut bands = read_bands(bytes, &layout)?;

        debug!(
            width = layout.width,
            height = layout.height,
            bands = bands.len(),
            planar = layout.planar,
            compression = layout.compression,
            "Decoded raster"
        );

        // Drop anything past the EVI band before moving the two we keep out.
        bands.truncate(EVI_BAND + 1);
        let evi = bands.swap_remove(EVI_BAND);
        let ndvi = bands.swap_remove(NDVI_BAND);

        Frame::new(ndvi, evi, layout.width, layout.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleKind {
    Unsigned,
    Signed,
    Float,
}

/// Sample grid and chunk table of the first image in a TIFF.
#[derive(Debug, Clone)]
struct RasterLayout {
    width: usize,
    height: usize,
    samples: usize,
    bits: usize,
    kind: SampleKind,
    /// Band-sequential (`PlanarConfiguration = 2`) rather than interleaved
    planar: bool,
    compression: u16,
    predictor: u16,
    tiled: bool,
    chunk_width: usize,
    chunk_height: usize,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    little_endian: bool,
}

impl RasterLayout {
    fn read(bytes: &[u8], max_buffer_bytes: usize) -> Result<Self, DecodeError> {
        let little_endian = match bytes.get(..2) {
            Some(b"II") => true,
            Some(b"MM") => false,
            _ => return Err(DecodeError::Malformed("missing TIFF byte order mark".to_string())),
        };

        let mut limits = Limits::default();
        limits.decoding_buffer_size = max_buffer_bytes;

        let mut decoder = Decoder::new(Cursor::new(bytes))
            .map_err(map_tiff_error)?
            .with_limits(limits);

        let (width, height) = decoder.dimensions().map_err(map_tiff_error)?;
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return Err(DecodeError::Malformed(format!("empty raster {}x{}", width, height)));
        }

        let samples = find_u16(&mut decoder, Tag::SamplesPerPixel)?.unwrap_or(1) as usize;
        let bits = uniform(&mut decoder, Tag::BitsPerSample, 1)? as usize;
        let kind = match uniform(&mut decoder, Tag::SampleFormat, 1)? {
            1 | 4 => SampleKind::Unsigned,
            2 => SampleKind::Signed,
            3 => SampleKind::Float,
            other => {
                return Err(DecodeError::UnsupportedFormat(format!("sample format {}", other)))
            }
        };
        match (kind, bits) {
            (SampleKind::Float, 32 | 64) | (SampleKind::Unsigned | SampleKind::Signed, 8 | 16 | 32 | 64) => {}
            _ => {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "{:?} samples of {} bits",
                    kind, bits
                )))
            }
        }

        let planar = find_u16(&mut decoder, Tag::PlanarConfiguration)?.unwrap_or(1) == 2;
        let compression = find_u16(&mut decoder, Tag::Compression)?.unwrap_or(COMPRESSION_NONE);
        let predictor = find_u16(&mut decoder, Tag::Predictor)?.unwrap_or(PREDICTOR_NONE);
        if predictor == PREDICTOR_FLOAT && kind != SampleKind::Float {
            return Err(DecodeError::UnsupportedFormat(
                "floating point predictor on integer samples".to_string(),
            ));
        }

        let tiled = matches!(decoder.get_chunk_type(), ChunkType::Tile);
        let (chunk_width, chunk_height, offsets, byte_counts) = if tiled {
            let (tile_width, tile_height) = decoder.chunk_dimensions();
            (
                tile_width as usize,
                tile_height as usize,
                decoder.get_tag_u64_vec(Tag::TileOffsets).map_err(map_tiff_error)?,
                decoder.get_tag_u64_vec(Tag::TileByteCounts).map_err(map_tiff_error)?,
            )
        } else {
            let rows_per_strip = decoder
                .find_tag_unsigned::<u64>(Tag::RowsPerStrip)
                .map_err(map_tiff_error)?
                .map_or(height, |rows| rows.min(height as u64) as usize);
            (
                width,
                rows_per_strip,
                decoder.get_tag_u64_vec(Tag::StripOffsets).map_err(map_tiff_error)?,
                decoder.get_tag_u64_vec(Tag::StripByteCounts).map_err(map_tiff_error)?,
            )
        };
        if chunk_width == 0 || chunk_height == 0 {
            return Err(DecodeError::Malformed("zero-sized chunk".to_string()));
        }

        Ok(Self {
            width,
            height,
            samples,
            bits,
            kind,
            planar,
            compression,
            predictor,
            tiled,
            chunk_width,
            chunk_height,
            offsets,
            byte_counts,
            little_endian,
        })
    }

    fn chunks_across(&self) -> usize {
        (self.width + self.chunk_width - 1) / self.chunk_width
    }

    fn chunks_down(&self) -> usize {
        (self.height + self.chunk_height - 1) / self.chunk_height
    }

    /// Samples stored per pixel inside one chunk.
    fn chunk_samples(&self) -> usize {
        if self.planar {
            1
        } else {
            self.samples
        }
    }

    fn bytes_per_sample(&self) -> usize {
        self.bits / 8
    }
}

/// Read every chunk and scatter its samples into one vector per band.
///
/// Interleaved chunks carry all bands; band-sequential files store the
/// chunks of band 0 first, then band 1, and so on.
fn read_bands(bytes: &[u8], layout: &RasterLayout) -> Result<Vec<Vec<f32>>, DecodeError> {
    let pixels = layout.width * layout.height;
    let planes = if layout.planar { layout.samples } else { 1 };
    let per_plane = layout.chunks_across() * layout.chunks_down();
    let expected = per_plane * planes;
    if layout.offsets.len() < expected || layout.byte_counts.len() < expected {
        return Err(DecodeError::Malformed(format!(
            "{} chunks listed, {} required",
            layout.offsets.len().min(layout.byte_counts.len()),
            expected
        )));
    }

    let spp = layout.chunk_samples();
    let row_stride = layout.chunk_width * spp * layout.bytes_per_sample();
    let mut bands = vec![vec![0.0f32; pixels]; layout.samples];

    for plane in 0..planes {
        for chunk in 0..per_plane {
            let index = plane * per_plane + chunk;
            let x0 = (chunk % layout.chunks_across()) * layout.chunk_width;
            let y0 = (chunk / layout.chunks_across()) * layout.chunk_height;
            let rows = layout.chunk_height.min(layout.height - y0);
            let cols = layout.chunk_width.min(layout.width - x0);
            // Tiles are padded to full size; the last strip may be short.
            let stored_rows = if layout.tiled { layout.chunk_height } else { rows };

            let raw = chunk_bytes(bytes, layout.offsets[index], layout.byte_counts[index])?;
            let mut data = decompress(raw, layout.compression, stored_rows * row_stride)?;
            if data.len() < rows * row_stride {
                return Err(DecodeError::Malformed(format!(
                    "chunk {} holds {} bytes, expected {}",
                    index,
                    data.len(),
                    rows * row_stride
                )));
            }

            for (r, row) in data.chunks_exact_mut(row_stride).take(rows).enumerate() {
                let values = decode_row(row, layout, spp)?;
                let base = (y0 + r) * layout.width + x0;
                for col in 0..cols {
                    for s in 0..spp {
                        let band = if layout.planar { plane } else { s };
                        bands[band][base + col] = values[col * spp + s];
                    }
                }
            }
        }
    }

    Ok(bands)
}

fn chunk_bytes(bytes: &[u8], offset: u64, count: u64) -> Result<&[u8], DecodeError> {
    let start = usize::try_from(offset).map_err(|_| DecodeError::Malformed("chunk offset overflow".to_string()))?;
    let end = usize::try_from(count)
        .ok()
        .and_then(|count| start.checked_add(count))
        .ok_or_else(|| DecodeError::Malformed("chunk length overflow".to_string()))?;
    bytes.get(start..end).ok_or_else(|| {
        DecodeError::Malformed(format!(
            "chunk at {}..{} lies outside the {} byte file",
            start,
            end,
            bytes.len()
        ))
    })
}

/// Inflate one chunk. The output is cut to `expected` bytes, which some
/// LZW writers overshoot.
fn decompress(raw: &[u8], compression: u16, expected: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = match compression {
        COMPRESSION_NONE => raw.to_vec(),
        COMPRESSION_DEFLATE | COMPRESSION_DEFLATE_LEGACY => {
            let mut out = Vec::with_capacity(expected);
            ZlibDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| DecodeError::Malformed(format!("deflate: {}", e)))?;
            out
        }
        COMPRESSION_LZW => {
            let mut out = Vec::with_capacity(expected);
            // Old writers omit the end-of-information code, so a clean
            // end of input is accepted too.
            LzwDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
                .into_vec(&mut out)
                .decode(raw)
                .status
                .map_err(|e| DecodeError::Malformed(format!("lzw: {}", e)))?;
            out
        }
        COMPRESSION_PACKBITS => unpack_bits(raw)?,
        other => {
            return Err(DecodeError::UnsupportedFormat(format!("compression {}", other)));
        }
    };
    out.truncate(expected);
    Ok(out)
}

fn unpack_bits(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(raw.len() * 2);
    let mut i = 0;
    while i < raw.len() {
        let header = raw[i] as i8;
        i += 1;
        if header >= 0 {
            let len = header as usize + 1;
            let literal = raw
                .get(i..i + len)
                .ok_or_else(|| DecodeError::Malformed("packbits literal overruns chunk".to_string()))?;
            out.extend_from_slice(literal);
            i += len;
        } else if header != -128 {
            let byte = *raw
                .get(i)
                .ok_or_else(|| DecodeError::Malformed("packbits run overruns chunk".to_string()))?;
            out.extend(std::iter::repeat(byte).take((1 - header as isize) as usize));
            i += 1;
        }
    }
    Ok(out)
}

/// Convert one stored row to `f32`, undoing any predictor first.
fn decode_row(row: &mut [u8], layout: &RasterLayout, spp: usize) -> Result<Vec<f32>, DecodeError> {
    let count = row.len() / layout.bytes_per_sample();

    if layout.predictor == PREDICTOR_FLOAT {
        // Byte planes are big-endian whatever the file byte order.
        return Ok(match layout.bits {
            32 => {
                let mut out = vec![0.0f32; count];
                fp_predict_f32(row, &mut out, spp);
                out
            }
            _ => {
                let mut out = vec![0.0f64; count];
                fp_predict_f64(row, &mut out, spp);
                out.into_iter().map(|v| v as f32).collect()
            }
        });
    }

    let mut raw: Vec<u64> = row
        .chunks_exact(layout.bytes_per_sample())
        .map(|sample| read_unsigned(sample, layout.little_endian))
        .collect();

    match layout.predictor {
        PREDICTOR_NONE => {}
        PREDICTOR_HORIZONTAL => {
            let mask = if layout.bits == 64 { u64::MAX } else { (1u64 << layout.bits) - 1 };
            for i in spp..raw.len() {
                raw[i] = raw[i].wrapping_add(raw[i - spp]) & mask;
            }
        }
        other => {
            return Err(DecodeError::UnsupportedFormat(format!("predictor {}", other)));
        }
    }

    let shift = 64 - layout.bits as u32;
    Ok(raw
        .into_iter()
        .map(|bits| match (layout.kind, layout.bits) {
            (SampleKind::Float, 32) => f32::from_bits(bits as u32),
            (SampleKind::Float, _) => f64::from_bits(bits) as f32,
            (SampleKind::Signed, _) => ((bits << shift) as i64 >> shift) as f32,
            (SampleKind::Unsigned, _) => bits as f32,
        })
        .collect())
}

fn read_unsigned(sample: &[u8], little_endian: bool) -> u64 {
    let fold = |acc: u64, byte: &u8| acc << 8 | u64::from(*byte);
    if little_endian {
        sample.iter().rev().fold(0, fold)
    } else {
        sample.iter().fold(0, fold)
    }
}

fn find_u16<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<u16>, DecodeError> {
    decoder.find_tag_unsigned::<u16>(tag).map_err(map_tiff_error)
}

/// Read a per-sample tag whose values must all agree.
fn uniform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
    default: u16,
) -> Result<u16, DecodeError> {
    let values = decoder
        .find_tag_unsigned_vec::<u16>(tag)
        .map_err(map_tiff_error)?
        .unwrap_or_else(|| vec![default]);
    match values.split_first() {
        None => Ok(default),
        Some((first, rest)) if rest.iter().all(|v| v == first) => Ok(*first),
        Some(_) => Err(DecodeError::UnsupportedFormat(format!("mixed {:?} values {:?}", tag, values))),
    }
}

fn map_tiff_error(err: TiffError) -> DecodeError {
    match err {
        TiffError::UnsupportedError(e) => DecodeError::UnsupportedFormat(e.to_string()),
        other => DecodeError::Malformed(other.to_string()),
    }
}
