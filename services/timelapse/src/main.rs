//! NDVI timelapse command-line driver.
//!
//! Activates one dataset and shows a date, plays the timeline, or exports a
//! sketched region of interest.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use timelapse::roi::{export_region, parse_coords};
use timelapse::{DatasetSession, TimelapseConfig};
use vectorizer::{GeographicProjection, WebMercator, Wgs84};

#[derive(Parser, Debug)]
#[command(name = "ndvi-timelapse")]
#[command(about = "Vegetation index timelapse over a dated raster series")]
struct Args {
    /// Local directory or HTTP base URL holding the datasets
    #[arg(long, env = "NDVI_DATA_ROOT")]
    data_root: Option<String>,

    /// Dataset identifier
    #[arg(short, long, env = "NDVI_DATASET")]
    dataset: Option<String>,

    /// Frames to warm ahead of the displayed one
    #[arg(long, env = "NDVI_PREFETCH_COUNT")]
    prefetch_count: Option<usize>,

    /// Retries per prefetched frame
    #[arg(long, env = "NDVI_PREFETCH_RETRIES")]
    prefetch_retries: Option<u32>,

    /// Map scale used for dataset marker visibility
    #[arg(long, env = "NDVI_MAP_SCALE")]
    map_scale: Option<f64>,

    /// Directory for GeoJSON output (in-memory only when unset)
    #[arg(short, long, env = "NDVI_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print Prometheus metrics on exit
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Display the frame nearest to a date
    Show {
        #[arg(long)]
        date: String,
    },

    /// Play through the timeline
    Play {
        /// Passes over the full timeline
        #[arg(long, default_value_t = 1)]
        loops: usize,

        /// Milliseconds per stop
        #[arg(long, env = "NDVI_PLAY_RATE_MS")]
        rate_ms: Option<u64>,
    },

    /// Export a sketched region as a GeoJSON feature
    Roi {
        /// Closed ring as `x1,y1;x2,y2;...;x1,y1`
        #[arg(long)]
        coords: String,

        /// Coordinates are Web Mercator meters rather than degrees
        #[arg(long)]
        mercator: bool,
    },
}

impl Args {
    fn apply(&self, config: &mut TimelapseConfig) {
        if let Some(root) = &self.data_root {
            config.data_root = root.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(count) = self.prefetch_count {
            config.prefetch.count = count;
        }
        if let Some(retries) = self.prefetch_retries {
            config.prefetch.max_retries = retries;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Command::Play { rate_ms: Some(ms), .. } = self.command {
            config.play_rate = Duration::from_millis(ms);
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus: Option<PrometheusHandle> = if args.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    let mut config = TimelapseConfig::from_env();
    args.apply(&mut config);

    match &args.command {
        Command::Roi { coords, mercator } => {
            let ring = parse_coords(coords)?;
            let projection: &dyn GeographicProjection = if *mercator { &WebMercator } else { &Wgs84 };
            let feature = export_region(&ring, projection, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&feature)?);
        }

        Command::Show { date } => {
            let session = activate(&config, args.map_scale).await?;
            let shown = session
                .timeline
                .on_scrub(date)
                .await
                .with_context(|| format!("Failed to show {}", date))?;
            info!(requested = %date, shown = %shown, "Frame displayed");
            session.controller.wait_for_prefetch().await;
            report_cache(&session).await;
        }

        Command::Play { loops, .. } => {
            let session = activate(&config, args.map_scale).await?;
            let summary = session.timeline.play(config.play_rate, *loops).await;
            session.controller.wait_for_prefetch().await;
            report_cache(&session).await;
            if summary.shown == 0 {
                anyhow::bail!("No frame could be displayed ({} failures)", summary.failed);
            }
        }
    }

    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }

    Ok(())
}

async fn activate(config: &TimelapseConfig, map_scale: Option<f64>) -> Result<DatasetSession> {
    info!(
        data_root = %config.data_root,
        dataset = %config.dataset,
        output_dir = ?config.output_dir,
        "Activating dataset"
    );
    let mut session = DatasetSession::activate(config)
        .await
        .with_context(|| format!("Failed to activate dataset '{}'", config.dataset))?;

    if let Some(scale) = map_scale {
        session.set_map_scale(scale);
    }
    let marker = &session.marker;
    info!(
        lon = marker.position.lon,
        lat = marker.position.lat,
        elevation_m = marker.elevation,
        visible = marker.is_visible(),
        "Dataset marker"
    );

    Ok(session)
}

async fn report_cache(session: &DatasetSession) {
    let stats = session.controller.cache().stats().await;
    timelapse::metrics::record_cache_stats(&stats);
    if stats.failures > 0 {
        warn!(failures = stats.failures, "Some frames failed to load");
    }
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        coalesced = stats.coalesced,
        hit_rate = format!("{:.1}%", stats.hit_rate()),
        memory_bytes = stats.memory_bytes,
        "Frame cache summary"
    );
}
