//! Common test fixtures for NDVI timelapse tests.
//!
//! This module provides pre-defined descriptors and on-disk dataset
//! layouts that represent common scenarios.

use std::fs;
use std::path::Path;

use crate::generators::{create_evi_from_ndvi, create_ndvi_ramp, encode_ndvi_tiff};

/// Common affine transforms, as `[pw, row_rot, x_min, col_rot, ph, y_max]`.
pub mod transforms {
    /// 0.01 degree pixels with the upper-left corner at (-10, 5)
    pub const HUNDREDTH_DEGREE: [f64; 6] = [0.01, 0.0, -10.0, 0.0, -0.01, 5.0];

    /// 1 degree pixels anchored at the origin
    pub const UNIT: [f64; 6] = [1.0, 0.0, 0.0, 0.0, -1.0, 0.0];
}

/// Common date lists.
pub mod dates {
    /// Three irregularly spaced dates (gaps of 9 and 10 days)
    pub const SPARSE_JANUARY: [&str; 3] = ["2024-01-01", "2024-01-10", "2024-01-20"];

    /// Eight consecutive 16-day composites
    pub const COMPOSITES_16DAY: [&str; 8] = [
        "2024-01-01",
        "2024-01-17",
        "2024-02-02",
        "2024-02-18",
        "2024-03-05",
        "2024-03-21",
        "2024-04-06",
        "2024-04-22",
    ];
}

/// Nodata sentinel used by fixture datasets.
pub const NODATA: f64 = -9999.0;

/// Builds a descriptor JSON document.
pub fn descriptor_json(dates: &[&str], transform: [f64; 6], nodata: f64) -> String {
    serde_json::json!({
        "dates": dates,
        "transform": transform,
        "nodata": nodata,
        "center": { "lon": transform[2], "lat": transform[5] },
    })
    .to_string()
}

/// Writes a complete dataset (`index.json` plus one TIFF per date) under
/// `root/{id}/`.
///
/// Every frame is a `width x height` NDVI ramp; `skip_rasters` lists dates
/// whose TIFF is left out to simulate a missing asset.
pub fn write_dataset(
    root: &Path,
    id: &str,
    dates: &[&str],
    width: u32,
    height: u32,
    skip_rasters: &[&str],
) -> std::io::Result<()> {
    let dir = root.join(id);
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join("index.json"),
        descriptor_json(dates, transforms::HUNDREDTH_DEGREE, NODATA),
    )?;

    let ndvi = create_ndvi_ramp(width as usize, height as usize);
    let evi = create_evi_from_ndvi(&ndvi);
    let tiff = encode_ndvi_tiff(width, height, &ndvi, &evi);

    for date in dates.iter().filter(|d| !skip_rasters.contains(d)) {
        fs::write(dir.join(format!("{}.tif", date)), &tiff)?;
    }
    Ok(())
}
