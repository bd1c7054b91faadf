//! Background warming of the frame cache for upcoming dates.
//!
//! At most one batch runs per prefetcher. A request that arrives while a
//! batch is active is dropped, not queued; the next display triggers a
//! fresh batch anyway.

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use storage::FrameCache;

use crate::config::PrefetchPolicy;
use crate::metrics;

/// Summary of one prefetch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Dates that were not cached and had a load issued
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Cached frames once the batch settled
    pub cache_size: usize,
}

/// Dates to warm after `from_index`: the next `count` positions, wrapping
/// around the end, without repeats and never `from_index` itself.
pub fn upcoming_dates(from_index: usize, count: usize, dates: &[String]) -> Vec<String> {
    let len = dates.len();
    if len == 0 {
        return Vec::new();
    }

    let mut targets: Vec<String> = Vec::with_capacity(count.min(len));
    for i in 1..=count {
        let index = (from_index + i) % len;
        if index == from_index % len {
            break;
        }
        targets.push(dates[index].clone());
    }
    targets
}

/// Clears the active flag when a batch ends, however it ends.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Warms a [`FrameCache`] ahead of playback.
///
/// Cheap to clone; clones share the cache and the active flag.
#[derive(Clone)]
pub struct Prefetcher {
    cache: FrameCache,
    policy: PrefetchPolicy,
    active: Arc<AtomicBool>,
}

impl Prefetcher {
    pub fn new(cache: FrameCache, policy: PrefetchPolicy) -> Self {
        Self {
            cache,
            policy,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn policy(&self) -> PrefetchPolicy {
        self.policy
    }

    /// Whether a batch is currently running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Warm the `count` dates following `from_index`.
    ///
    /// Returns `None` without doing anything if another batch is active.
    /// Individual failures are logged and counted, never returned.
    pub async fn preload(&self, from_index: usize, count: usize, dates: &[String]) -> Option<PrefetchReport> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(from_index = from_index, "Prefetch already running, skipping");
            return None;
        }
        let _guard = ActiveGuard(self.active.clone());

        let start = Instant::now();
        let mut pending = Vec::new();
        for date in upcoming_dates(from_index, count, dates) {
            if !self.cache.has(&date).await {
                pending.push(date);
            }
        }

        let outcomes = join_all(pending.iter().map(|date| self.load_with_retries(date))).await;

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        let report = PrefetchReport {
            attempted: pending.len(),
            succeeded,
            failed: pending.len() - succeeded,
            cache_size: self.cache.len().await,
        };

        info!(
            from_index = from_index,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            cache_size = report.cache_size,
            elapsed_ms = start.elapsed().as_millis(),
            "Prefetch batch complete"
        );
        metrics::record_prefetch(&report);

        Some(report)
    }

    /// Preload with the policy's frame count.
    pub async fn preload_default(&self, from_index: usize, dates: &[String]) -> Option<PrefetchReport> {
        self.preload(from_index, self.policy.count, dates).await
    }

    async fn load_with_retries(&self, date: &str) -> bool {
        let attempts = self.policy.max_retries + 1;
        for attempt in 1..=attempts {
            match self.cache.get_or_load(date).await {
                Ok(_) => return true,
                Err(e) => {
                    warn!(
                        date = %date,
                        attempt = attempt,
                        attempts = attempts,
                        error = %e,
                        "Prefetch load failed"
                    );
                }
            }
        }
        false
    }
}
