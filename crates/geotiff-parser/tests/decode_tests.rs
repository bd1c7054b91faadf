//! Decoding tests against TIFFs produced in memory.

use geotiff_parser::{DecodeError, GeoTiffDecoder, RasterDecoder};
use test_utils::{
    assert_approx_eq, create_evi_from_ndvi, create_ndvi_ramp, encode_bands_tiff, encode_ndvi_tiff,
    encode_ndvi_tiff_planar, encode_single_band_tiff, TiffLayout,
};

fn assert_bands_round_trip(bytes: &[u8], width: usize, height: usize, ndvi: &[f32], evi: &[f32]) {
    let frame = GeoTiffDecoder::new().decode(bytes).unwrap();

    assert_eq!(frame.width(), width);
    assert_eq!(frame.height(), height);
    assert_eq!(frame.ndvi(), ndvi);
    for (got, want) in frame.evi().iter().zip(evi) {
        assert_approx_eq!(*got, *want, 1e-6);
    }
}

#[test]
fn test_decode_two_band_raster() {
    let ndvi = create_ndvi_ramp(4, 3);
    let evi = create_evi_from_ndvi(&ndvi);
    let bytes = encode_ndvi_tiff(4, 3, &ndvi, &evi);

    let frame = GeoTiffDecoder::new().decode(&bytes).unwrap();

    assert_eq!(frame.width(), 4);
    assert_eq!(frame.height(), 3);
    assert_eq!(frame.len(), 12);
    assert_eq!(frame.ndvi(), ndvi.as_slice());
    for (got, want) in frame.evi().iter().zip(&evi) {
        assert_approx_eq!(*got, *want, 1e-6);
    }
}

#[test]
fn test_decode_two_sample_min_is_black_chunky() {
    let ndvi = vec![0.1, -0.2, 0.3, 0.9];
    let evi = vec![0.05, -0.1, 0.25, 0.7];
    let bytes = encode_ndvi_tiff(2, 2, &ndvi, &evi);

    assert_bands_round_trip(&bytes, 2, 2, &ndvi, &evi);
}

#[test]
fn test_decode_two_sample_min_is_black_planar() {
    let ndvi = vec![0.1, -0.2, 0.3, 0.9];
    let evi = vec![0.05, -0.1, 0.25, 0.7];
    let bytes = encode_ndvi_tiff_planar(2, 2, &ndvi, &evi);

    assert_bands_round_trip(&bytes, 2, 2, &ndvi, &evi);
}

#[test]
fn test_decode_planar_multi_strip_raster() {
    let ndvi = create_ndvi_ramp(5, 7);
    let evi = create_evi_from_ndvi(&ndvi);
    let layout = TiffLayout {
        planar: true,
        rows_per_strip: 3,
        ..TiffLayout::default()
    };
    let bytes = encode_bands_tiff(5, 7, &[ndvi.as_slice(), evi.as_slice()], layout);

    assert_bands_round_trip(&bytes, 5, 7, &ndvi, &evi);
}

#[test]
fn test_decode_deflate_strips() {
    let ndvi = create_ndvi_ramp(6, 4);
    let evi = create_evi_from_ndvi(&ndvi);
    for planar in [false, true] {
        let layout = TiffLayout {
            planar,
            rows_per_strip: 1,
            deflate: true,
        };
        let bytes = encode_bands_tiff(6, 4, &[ndvi.as_slice(), evi.as_slice()], layout);

        assert_bands_round_trip(&bytes, 6, 4, &ndvi, &evi);
    }
}

#[test]
fn test_extra_bands_are_ignored() {
    let ndvi = vec![0.4; 6];
    let evi = vec![0.2; 6];
    let quality = vec![9.0; 6];
    let bands = [ndvi.as_slice(), evi.as_slice(), quality.as_slice()];
    let bytes = encode_bands_tiff(3, 2, &bands, TiffLayout::default());

    assert_bands_round_trip(&bytes, 3, 2, &ndvi, &evi);
}

#[test]
fn test_decode_keeps_nan_samples() {
    let mut ndvi = vec![0.3f32; 4];
    ndvi[2] = f32::NAN;
    let bytes = encode_ndvi_tiff(2, 2, &ndvi, &[0.1; 4]);

    let frame = GeoTiffDecoder::new().decode(&bytes).unwrap();
    assert!(frame.ndvi()[2].is_nan());
    assert_eq!(frame.ndvi()[3], 0.3);
}

#[test]
fn test_single_band_raster_is_rejected() {
    let bytes = encode_single_band_tiff(2, 2, &[0.5; 4]);
    let err = GeoTiffDecoder::new().decode(&bytes).unwrap_err();
    assert_eq!(err, DecodeError::MissingBands { found: 1, required: 2 });
}

#[test]
fn test_truncated_raster_fails() {
    let bytes = encode_ndvi_tiff(8, 8, &[0.5; 64], &[0.5; 64]);
    let truncated = &bytes[..bytes.len() / 3];
    assert!(GeoTiffDecoder::new().decode(truncated).is_err());
}

#[test]
fn test_buffer_limit_is_enforced() {
    let bytes = encode_ndvi_tiff(16, 16, &[0.5; 256], &[0.5; 256]);
    let decoder = GeoTiffDecoder::new().with_max_buffer_bytes(64);
    assert!(decoder.decode(&bytes).is_err());
}
