//! Dataset location marker with scale-dependent visibility.

use ndvi_common::GeoPoint;

/// Height the marker floats at, in meters.
pub const MARKER_ELEVATION_M: f64 = 8000.0;

/// Above this map scale the marker is shown.
pub const SHOW_ABOVE_SCALE: f64 = 100_000.0;

/// Below this map scale the marker is hidden.
pub const HIDE_BELOW_SCALE: f64 = 50_000.0;

/// Marker placed at the dataset center.
///
/// Between the two thresholds visibility does not change, so zooming around
/// a single threshold does not make the marker flicker.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetMarker {
    pub position: GeoPoint,
    pub elevation: f64,
    visible: bool,
}

impl DatasetMarker {
    pub fn new(center: GeoPoint) -> Self {
        Self {
            position: center,
            elevation: MARKER_ELEVATION_M,
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Apply a new map scale; returns the resulting visibility.
    pub fn on_scale(&mut self, scale: f64) -> bool {
        if scale > SHOW_ABOVE_SCALE {
            self.visible = true;
        } else if scale < HIDE_BELOW_SCALE {
            self.visible = false;
        }
        self.visible
    }
}
