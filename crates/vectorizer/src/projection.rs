//! Conversion of ring coordinates to geographic longitude/latitude.
//!
//! Rasters and sketches may come in a projected CRS; the rendering side
//! expects WGS84. Only the narrow "to geographic" direction is needed.

use std::f64::consts::PI;

/// WGS84 semi-major axis used by Web Mercator (meters).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Converts source-CRS coordinates to `[lon, lat]` degrees.
pub trait GeographicProjection: Send + Sync {
    fn to_geographic(&self, coord: [f64; 2]) -> [f64; 2];

    /// True when `to_geographic` returns its input unchanged.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Convert every coordinate of a ring in place.
pub fn ring_to_geographic<P: GeographicProjection + ?Sized>(projection: &P, ring: &mut [[f64; 2]]) {
    if projection.is_identity() {
        return;
    }
    for coord in ring.iter_mut() {
        *coord = projection.to_geographic(*coord);
    }
}

/// Data already in EPSG:4326.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84;

impl GeographicProjection for Wgs84 {
    fn to_geographic(&self, coord: [f64; 2]) -> [f64; 2] {
        coord
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Spherical Web Mercator (EPSG:3857) meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl GeographicProjection for WebMercator {
    fn to_geographic(&self, [x, y]: [f64; 2]) -> [f64; 2] {
        let lon = (x / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
        [lon, lat]
    }
}
