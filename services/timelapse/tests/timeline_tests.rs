//! Tests for timeline position resolution and playback.

mod common;

use chrono::{TimeZone, Utc};
use std::time::Duration;

use common::harness;
use ndvi_common::DatasetError;
use test_utils::fixtures::dates::{COMPOSITES_16DAY, SPARSE_JANUARY};
use timelapse::{PrefetchPolicy, TimelineDriver};

fn no_prefetch() -> PrefetchPolicy {
    PrefetchPolicy { count: 0, max_retries: 0 }
}

fn driver(dates: &[&str]) -> (common::Harness, TimelineDriver) {
    let h = harness(dates, no_prefetch());
    let driver = TimelineDriver::new(h.controller.clone()).unwrap();
    (h, driver)
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_exact_date_match() {
    let (h, driver) = driver(&SPARSE_JANUARY);
    assert_eq!(driver.on_scrub("2024-01-20").await.unwrap(), "2024-01-20");
    assert_eq!(h.controller.current_index().await, Some(2));
}

#[tokio::test]
async fn test_between_dates_snaps_to_nearest() {
    let (h, driver) = driver(&SPARSE_JANUARY);
    assert_eq!(driver.on_scrub("2024-01-06").await.unwrap(), "2024-01-10");
    assert_eq!(h.controller.current_index().await, Some(1));
}

#[test]
fn test_resolution_edges() {
    let (_h, driver) = driver(&SPARSE_JANUARY);
    assert_eq!(driver.resolve("2023-06-01").unwrap(), 0);
    assert_eq!(driver.resolve("2025-01-01").unwrap(), 2);
    // Exactly halfway between the first two dates
    assert_eq!(driver.resolve("2024-01-05T12:00:00Z").unwrap(), 0);
    assert!(matches!(driver.resolve("next tuesday"), Err(DatasetError::NotFound(_))));
}

#[tokio::test]
async fn test_clock_position() {
    let (_h, driver) = driver(&SPARSE_JANUARY);

    let late_on_the_20th = Utc.with_ymd_and_hms(2024, 1, 20, 23, 0, 0).unwrap();
    assert_eq!(driver.on_clock(late_on_the_20th).await.unwrap(), "2024-01-20");

    let between = Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap();
    assert_eq!(driver.on_clock(between).await.unwrap(), "2024-01-10");
}

#[test]
fn test_empty_dataset_is_not_found() {
    let h = harness(&[], no_prefetch());
    assert!(matches!(
        TimelineDriver::new(h.controller.clone()),
        Err(DatasetError::NotFound(_))
    ));
}

// ============================================================================
// Stepping and playback
// ============================================================================

#[tokio::test]
async fn test_step_forward_and_back_wrap() {
    let (_h, driver) = driver(&SPARSE_JANUARY);

    assert_eq!(driver.step_forward().await.unwrap(), "2024-01-01");
    assert_eq!(driver.step_back().await.unwrap(), "2024-01-20");
    assert_eq!(driver.step_forward().await.unwrap(), "2024-01-01");
    assert_eq!(driver.step_forward().await.unwrap(), "2024-01-10");
}

#[tokio::test]
async fn test_step_back_from_idle_goes_to_last() {
    let (_h, driver) = driver(&SPARSE_JANUARY);
    assert_eq!(driver.step_back().await.unwrap(), "2024-01-20");
}

#[tokio::test]
async fn test_play_continues_past_failures() {
    let (h, driver) = driver(&COMPOSITES_16DAY);
    h.loader.fail(COMPOSITES_16DAY[3]);

    let summary = driver.play(Duration::from_millis(1), 2).await;

    assert_eq!(summary.shown, 14);
    assert_eq!(summary.failed, 2);
    assert_eq!(h.controller.current_index().await, Some(7));
}

#[tokio::test]
async fn test_play_starts_after_displayed_frame() {
    let (h, driver) = driver(&SPARSE_JANUARY);
    driver.on_scrub("2024-01-10").await.unwrap();

    let summary = driver.play(Duration::from_millis(1), 1).await;

    assert_eq!(summary.shown, 3);
    assert_eq!(h.controller.current_index().await, Some(1));
    assert_eq!(h.sink.current().unwrap().date, "2024-01-10");
}
