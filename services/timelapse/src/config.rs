//! Runtime configuration for the timelapse service.
//!
//! Values come from environment variables (optionally seeded from a `.env`
//! file) and may be overridden by command-line flags.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Frames warmed ahead of the displayed one when nothing else is configured.
pub const DEFAULT_PREFETCH_COUNT: usize = 3;

/// Default delay between timeline stops during playback.
pub const DEFAULT_PLAY_RATE_MS: u64 = 1000;

/// How many upcoming frames to warm and how hard to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchPolicy {
    /// Frames after the displayed index to warm (wrapping)
    pub count: usize,
    /// Extra attempts per frame after the first failure; 0 logs and moves on
    pub max_retries: u32,
}

impl Default for PrefetchPolicy {
    fn default() -> Self {
        Self {
            count: DEFAULT_PREFETCH_COUNT,
            max_retries: 0,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseConfig {
    /// Local directory or HTTP base URL holding `{dataset}/index.json`
    pub data_root: String,
    pub dataset: String,
    pub prefetch: PrefetchPolicy,
    pub play_rate: Duration,
    /// Where GeoJSON frames are written; `None` keeps features in memory only
    pub output_dir: Option<PathBuf>,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            data_root: "./data".to_string(),
            dataset: "default".to_string(),
            prefetch: PrefetchPolicy::default(),
            play_rate: Duration::from_millis(DEFAULT_PLAY_RATE_MS),
            output_dir: None,
        }
    }
}

impl TimelapseConfig {
    /// Load configuration from environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let parse_u64 = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            data_root: lookup("NDVI_DATA_ROOT").unwrap_or(defaults.data_root),
            dataset: lookup("NDVI_DATASET").unwrap_or(defaults.dataset),
            prefetch: PrefetchPolicy {
                count: parse_u64("NDVI_PREFETCH_COUNT", DEFAULT_PREFETCH_COUNT as u64) as usize,
                max_retries: parse_u64("NDVI_PREFETCH_RETRIES", 0) as u32,
            },
            play_rate: Duration::from_millis(parse_u64("NDVI_PLAY_RATE_MS", DEFAULT_PLAY_RATE_MS)),
            output_dir: lookup("NDVI_OUTPUT_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TimelapseConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TimelapseConfig::default());
        assert_eq!(config.prefetch.count, 3);
        assert_eq!(config.prefetch.max_retries, 0);
        assert_eq!(config.play_rate, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides() {
        let config = TimelapseConfig::from_lookup(lookup(&[
            ("NDVI_DATA_ROOT", "https://example.org/ndvi"),
            ("NDVI_DATASET", "farm"),
            ("NDVI_PREFETCH_COUNT", "5"),
            ("NDVI_PREFETCH_RETRIES", "2"),
            ("NDVI_PLAY_RATE_MS", "250"),
            ("NDVI_OUTPUT_DIR", "/tmp/ndvi"),
        ]));
        assert_eq!(config.data_root, "https://example.org/ndvi");
        assert_eq!(config.dataset, "farm");
        assert_eq!(config.prefetch, PrefetchPolicy { count: 5, max_retries: 2 });
        assert_eq!(config.play_rate, Duration::from_millis(250));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/ndvi")));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = TimelapseConfig::from_lookup(lookup(&[
            ("NDVI_PREFETCH_COUNT", "many"),
            ("NDVI_OUTPUT_DIR", " "),
        ]));
        assert_eq!(config.prefetch.count, DEFAULT_PREFETCH_COUNT);
        assert!(config.output_dir.is_none());
    }
}
