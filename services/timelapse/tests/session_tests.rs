//! End-to-end tests over an on-disk dataset.

use ndvi_common::{ConfigError, DatasetError};
use tokio_test::{assert_err, assert_ok};
use test_utils::fixtures::{self, dates::SPARSE_JANUARY};
use timelapse::{DatasetSession, PrefetchPolicy, TimelapseConfig};

fn config(root: &std::path::Path, out: Option<std::path::PathBuf>) -> TimelapseConfig {
    TimelapseConfig {
        data_root: root.to_str().unwrap().to_string(),
        dataset: "farm".to_string(),
        output_dir: out,
        ..TimelapseConfig::default()
    }
}

#[tokio::test]
async fn test_show_writes_geojson() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_dataset(dir.path(), "farm", &SPARSE_JANUARY, 5, 4, &[]).unwrap();
    let out = dir.path().join("out");

    let session = DatasetSession::activate(&config(dir.path(), Some(out.clone())))
        .await
        .unwrap();
    assert_eq!(session.timeline.stops().len(), 3);
    assert!(session.marker.is_visible());

    let shown = session.timeline.on_scrub("2024-01-06").await.unwrap();
    assert_eq!(shown, "2024-01-10");
    let reports = session.controller.wait_for_prefetch().await;
    assert_eq!(reports[0].succeeded, 2);

    let current: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join("current.geojson")).unwrap()).unwrap();
    let features = current["features"].as_array().unwrap();
    assert_eq!(features.len(), 20);
    assert_eq!(features[0]["properties"]["date"], "2024-01-10");
    assert_eq!(features[0]["properties"]["fill"], "#781e1e");
    assert!(out.join("2024-01-10.geojson").exists());
}

#[tokio::test]
async fn test_marker_follows_map_scale() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_dataset(dir.path(), "farm", &SPARSE_JANUARY, 2, 2, &[]).unwrap();

    let mut session = DatasetSession::activate(&config(dir.path(), None)).await.unwrap();
    assert_eq!(session.marker.position.lon, -10.0);
    assert_eq!(session.marker.position.lat, 5.0);

    assert!(!session.set_map_scale(20_000.0));
    assert!(!session.set_map_scale(80_000.0));
    assert!(!session.marker.is_visible());
    assert!(session.set_map_scale(250_000.0));
    assert!(session.marker.is_visible());
}

#[tokio::test]
async fn test_missing_raster_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_dataset(dir.path(), "farm", &SPARSE_JANUARY, 3, 3, &["2024-01-20"]).unwrap();

    let session = DatasetSession::activate(&config(dir.path(), None)).await.unwrap();
    assert_ok!(session.timeline.on_scrub("2024-01-01").await);

    let err = assert_err!(session.timeline.on_scrub("2024-01-20").await);
    assert!(err.is_recoverable());
    assert_eq!(session.controller.current_date().await.as_deref(), Some("2024-01-01"));
}

#[tokio::test]
async fn test_missing_descriptor_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let err = DatasetSession::activate(&config(dir.path(), None)).await.err().unwrap();
    assert!(matches!(err, DatasetError::Config(ConfigError::Unreachable { .. })));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_empty_dataset_fails_activation() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_dataset(dir.path(), "farm", &[], 2, 2, &[]).unwrap();

    let mut cfg = config(dir.path(), None);
    cfg.prefetch = PrefetchPolicy { count: 1, max_retries: 0 };
    assert!(matches!(
        DatasetSession::activate(&cfg).await,
        Err(DatasetError::NotFound(_))
    ));
}
