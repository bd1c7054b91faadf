//! Mapping of timeline positions onto dataset dates.
//!
//! A scrubbed or clock position that does not land on a dataset date snaps
//! to the nearest one; on a tie the earlier date wins.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use ndvi_common::{date_key, nearest_index, parse_timestamp, ConfigError, DatasetError, DatasetResult};

use crate::controller::DatasetController;

/// Counts from a [`TimelineDriver::play`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub shown: usize,
    pub failed: usize,
}

pub struct TimelineDriver {
    controller: Arc<DatasetController>,
    dates: Vec<String>,
    times: Vec<DateTime<Utc>>,
}

impl TimelineDriver {
    /// Fails with `NotFound` when the dataset has no dates.
    pub fn new(controller: Arc<DatasetController>) -> DatasetResult<Self> {
        let dates = controller.config().dates.clone();
        if dates.is_empty() {
            return Err(DatasetError::NotFound(format!(
                "dataset '{}' has no dates",
                controller.config().id
            )));
        }

        let times = dates
            .iter()
            .map(|d| parse_timestamp(d).map_err(|e| ConfigError::invalid_field("dates", e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            controller,
            dates,
            times,
        })
    }

    pub fn controller(&self) -> &Arc<DatasetController> {
        &self.controller
    }

    /// Timeline stops, earliest first.
    pub fn stops(&self) -> &[String] {
        &self.dates
    }

    /// Index to display for `target`: exact date match, else the nearest
    /// date in time.
    pub fn resolve(&self, target: &str) -> DatasetResult<usize> {
        if let Some(index) = self.dates.iter().position(|d| d == target) {
            return Ok(index);
        }

        let instant = parse_timestamp(target)
            .map_err(|e| DatasetError::NotFound(format!("cannot place '{}' on the timeline: {}", target, e)))?;
        self.nearest(instant)
    }

    fn nearest(&self, instant: DateTime<Utc>) -> DatasetResult<usize> {
        nearest_index(&self.times, instant)
            .ok_or_else(|| DatasetError::NotFound("timeline has no stops".to_string()))
    }

    /// Display the date selected by a scrub to `target`.
    pub async fn on_scrub(&self, target: &str) -> DatasetResult<String> {
        let index = self.resolve(target)?;
        if self.dates[index] != target {
            warn!(target = %target, snapped_to = %self.dates[index], "Date not in dataset, using nearest");
        }
        self.controller.show_date(index).await
    }

    /// Display the date selected by a clock position.
    ///
    /// The instant is first matched by calendar day, then by time distance.
    pub async fn on_clock(&self, instant: DateTime<Utc>) -> DatasetResult<String> {
        let key = date_key(&instant);
        let index = match self.dates.iter().position(|d| *d == key) {
            Some(index) => index,
            None => self.nearest(instant)?,
        };
        self.controller.show_date(index).await
    }

    /// Display the next stop, wrapping to the first.
    pub async fn step_forward(&self) -> DatasetResult<String> {
        let next = match self.controller.current_index().await {
            Some(i) => (i + 1) % self.dates.len(),
            None => 0,
        };
        self.controller.show_date(next).await
    }

    /// Display the previous stop, wrapping to the last.
    pub async fn step_back(&self) -> DatasetResult<String> {
        let len = self.dates.len();
        let previous = match self.controller.current_index().await {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.controller.show_date(previous).await
    }

    /// Step through every stop `loops` times, one stop per `rate`, starting
    /// after the displayed one.
    ///
    /// Frames that fail to display are logged and skipped; playback goes on.
    pub async fn play(&self, rate: Duration, loops: usize) -> PlaybackSummary {
        let len = self.dates.len();
        let mut summary = PlaybackSummary::default();
        let mut cursor = match self.controller.current_index().await {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        let mut interval = tokio::time::interval(rate);

        info!(stops = len, loops = loops, rate_ms = rate.as_millis(), "Starting playback");

        for _ in 0..loops * len {
            interval.tick().await;
            match self.controller.show_date(cursor).await {
                Ok(_) => summary.shown += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(date = %self.dates[cursor], error = %e, "Skipping frame during playback");
                }
            }
            cursor = (cursor + 1) % len;
        }

        info!(shown = summary.shown, failed = summary.failed, "Playback finished");
        summary
    }
}
