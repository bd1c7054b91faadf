//! In-memory cache of decoded frames, keyed by dataset date.
//!
//! Frames are kept for the lifetime of the dataset; there is no eviction.
//! Loads are coalesced: while a date is being loaded, further requests for
//! it wait on the same in-flight load instead of starting another one.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ndvi_common::{Frame, LoadError};

use crate::loader::FrameLoader;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Frame>, LoadError>>>;

/// Statistics for the frame cache.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameCacheStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that started a load
    pub misses: u64,
    /// Requests that joined a load already in flight
    pub coalesced: u64,
    /// Loads that failed (never cached)
    pub failures: u64,
    pub entries: usize,
    /// Bytes of sample data held
    pub memory_bytes: u64,
}

impl FrameCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Default)]
struct CacheState {
    frames: HashMap<String, Arc<Frame>>,
    in_flight: HashMap<String, SharedLoad>,
}

struct Inner {
    state: Mutex<CacheState>,
    loader: Arc<dyn FrameLoader>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
    memory_bytes: AtomicU64,
}

/// Date-keyed frame cache with single-flight loading.
///
/// Cheap to clone; clones share the same frames and in-flight loads.
#[derive(Clone)]
pub struct FrameCache {
    inner: Arc<Inner>,
}

impl FrameCache {
    pub fn new(loader: Arc<dyn FrameLoader>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState::default()),
                loader,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                memory_bytes: AtomicU64::new(0),
            }),
        }
    }

    /// Cached frame for `date`, without loading and without touching stats.
    pub async fn get(&self, date: &str) -> Option<Arc<Frame>> {
        self.inner.state.lock().await.frames.get(date).cloned()
    }

    /// Cached frame for `date`, loading it if needed.
    ///
    /// Concurrent calls for the same uncached date share one load and all
    /// receive the same `Arc<Frame>` (or the same error). Failed loads are
    /// not cached, so the next call retries.
    pub async fn get_or_load(&self, date: &str) -> Result<Arc<Frame>, LoadError> {
        let load = {
            let mut state = self.inner.state.lock().await;

            if let Some(frame) = state.frames.get(date) {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                debug!(date = %date, "Frame cache hit");
                return Ok(frame.clone());
            }

            match state.in_flight.get(date) {
                Some(load) => {
                    self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(date = %date, "Joining in-flight frame load");
                    load.clone()
                }
                None => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    let load = Self::start_load(self.inner.clone(), date.to_string());
                    state.in_flight.insert(date.to_string(), load.clone());
                    load
                }
            }
        };

        load.await
    }

    /// Build the shared load future for `date`.
    ///
    /// The future publishes its own outcome: on success the frame is stored
    /// before the in-flight entry is removed, under the same lock, so no
    /// caller can observe the date as neither cached nor loading.
    fn start_load(inner: Arc<Inner>, date: String) -> SharedLoad {
        async move {
            let start = Instant::now();
            let result = inner.loader.load(&date).await.map(Arc::new);

            let mut state = inner.state.lock().await;
            state.in_flight.remove(&date);

            match &result {
                Ok(frame) => {
                    inner
                        .memory_bytes
                        .fetch_add(frame.size_bytes() as u64, Ordering::Relaxed);
                    state.frames.insert(date.clone(), frame.clone());
                    info!(
                        date = %date,
                        elapsed_ms = start.elapsed().as_millis(),
                        entries = state.frames.len(),
                        "Frame cached"
                    );
                }
                Err(e) => {
                    inner.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(date = %date, error = %e, "Frame load failed");
                }
            }

            result
        }
        .boxed()
        .shared()
    }

    /// Whether a frame for `date` is cached.
    pub async fn has(&self, date: &str) -> bool {
        self.inner.state.lock().await.frames.contains_key(date)
    }

    /// Whether a load for `date` is currently in flight.
    pub async fn is_loading(&self, date: &str) -> bool {
        self.inner.state.lock().await.in_flight.contains_key(date)
    }

    /// Number of successfully cached frames.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.frames.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.frames.is_empty()
    }

    /// Get current cache statistics.
    pub async fn stats(&self) -> FrameCacheStats {
        let entries = self.len().await;
        FrameCacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
            entries,
            memory_bytes: self.inner.memory_bytes.load(Ordering::Relaxed),
        }
    }
}
