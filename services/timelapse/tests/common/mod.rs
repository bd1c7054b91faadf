//! Shared fixtures for timelapse integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ndvi_common::{DatasetConfig, DecodeError, Frame, LoadError};
use storage::{FrameCache, FrameLoader};
use test_utils::{create_evi_from_ndvi, create_ndvi_ramp, descriptor_json, fixtures};
use timelapse::{DatasetController, MemorySink, PrefetchPolicy, Prefetcher};
use vectorizer::VectorBuilder;

pub const WIDTH: usize = 4;
pub const HEIGHT: usize = 3;

/// In-process loader with per-date failures and delays.
#[derive(Default)]
pub struct ScriptedLoader {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    failing: Mutex<HashMap<String, usize>>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Mutex<Duration>,
}

impl ScriptedLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every load of `date` fails.
    pub fn fail(&self, date: &str) {
        self.fail_times(date, usize::MAX);
    }

    /// The next `times` loads of `date` fail.
    pub fn fail_times(&self, date: &str, times: usize) {
        self.failing.lock().unwrap().insert(date.to_string(), times);
    }

    pub fn delay(&self, date: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(date.to_string(), delay);
    }

    pub fn delay_all(&self, delay: Duration) {
        *self.default_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self, date: &str) -> usize {
        self.calls.lock().unwrap().get(date).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameLoader for ScriptedLoader {
    async fn load(&self, date: &str) -> Result<Frame, LoadError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(date.to_string()).or_default() += 1;

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(date)
            .copied()
            .unwrap_or(*self.default_delay.lock().unwrap());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failing = self.failing.lock().unwrap();
            if let Some(remaining) = failing.get_mut(date) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(LoadError::decode(date, DecodeError::Malformed("scripted failure".into())));
                }
            }
        }

        let ndvi = create_ndvi_ramp(WIDTH, HEIGHT);
        let evi = create_evi_from_ndvi(&ndvi);
        Ok(Frame::new(ndvi, evi, WIDTH, HEIGHT).unwrap())
    }
}

pub fn dataset(dates: &[&str]) -> Arc<DatasetConfig> {
    let json = descriptor_json(dates, fixtures::transforms::HUNDREDTH_DEGREE, fixtures::NODATA);
    Arc::new(DatasetConfig::from_json("farm", &json).unwrap())
}

pub struct Harness {
    pub loader: Arc<ScriptedLoader>,
    pub cache: FrameCache,
    pub sink: Arc<MemorySink>,
    pub controller: Arc<DatasetController>,
}

pub fn harness(dates: &[&str], policy: PrefetchPolicy) -> Harness {
    let loader = ScriptedLoader::new();
    let cache = FrameCache::new(loader.clone());
    let sink = Arc::new(MemorySink::new());
    let controller = Arc::new(DatasetController::new(
        dataset(dates),
        cache.clone(),
        VectorBuilder::default(),
        sink.clone(),
        Prefetcher::new(cache.clone(), policy),
    ));

    Harness {
        loader,
        cache,
        sink,
        controller,
    }
}
