//! Export of a sketched region of interest as GeoJSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map};
use thiserror::Error;

use vectorizer::{ring_to_geographic, Feature, GeographicProjection};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoiError {
    #[error("Region needs at least 4 positions, got {0}")]
    TooFewPoints(usize),

    #[error("Region ring is not closed (first and last positions differ)")]
    NotClosed,

    #[error("Region position {0} is not finite")]
    NonFinite(usize),

    #[error("Invalid coordinate list: {0}")]
    Parse(String),
}

/// Check that `ring` is a closed polygon ring.
pub fn validate_ring(ring: &[[f64; 2]]) -> Result<(), RoiError> {
    if ring.len() < 4 {
        return Err(RoiError::TooFewPoints(ring.len()));
    }
    if let Some(i) = ring.iter().position(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(RoiError::NonFinite(i));
    }
    if ring.first() != ring.last() {
        return Err(RoiError::NotClosed);
    }
    Ok(())
}

/// Convert a sketched ring (in map coordinates) to a GeoJSON polygon feature
/// stamped with `processed_at`.
pub fn export_region(
    ring: &[[f64; 2]],
    projection: &dyn GeographicProjection,
    processed_at: DateTime<Utc>,
) -> Result<Feature, RoiError> {
    validate_ring(ring)?;

    let mut geographic = ring.to_vec();
    ring_to_geographic(projection, &mut geographic);

    let mut properties = Map::new();
    properties.insert(
        "processedAt".to_string(),
        json!(processed_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    Ok(Feature::polygon(geographic, properties))
}

/// Parse `x1,y1;x2,y2;...` into positions.
pub fn parse_coords(input: &str) -> Result<Vec<[f64; 2]>, RoiError> {
    input
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| RoiError::Parse(format!("'{}' is not an x,y pair", pair)))?;
            let parse = |v: &str| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| RoiError::Parse(format!("'{}': {}", v.trim(), e)))
            };
            Ok([parse(x)?, parse(y)?])
        })
        .collect()
}
