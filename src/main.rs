//! tagsearch CLI
//!
//! Loads observations into an in-memory tag index and runs discovery queries
//! against it:
//! - Replay a JSON-lines file and summarise what was indexed
//! - Expand wildcard tag patterns against a replayed file
//! - Run a synthetic demo with a live snapshot scheduler

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tagsearch::config::generate_default_config;
use tagsearch::{Config, LoggingConfig, Observation, Search, TagQuery, TagSet};
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tagsearch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "In-memory tag index for time-series identity discovery")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a JSON-lines file of observations and print a summary
    Replay {
        /// One observation per line: {"metric":..,"tags":{..},"timestamp":..,"value":..}
        path: PathBuf,
    },

    /// Expand wildcard tag patterns against a replayed file
    Expand {
        path: PathBuf,
        /// Metric name
        metric: String,
        /// Tag patterns in key=pattern format, e.g. host=web*|db01
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Ingest synthetic data through the snapshot scheduler
    Demo {
        /// Number of hosts to simulate
        #[arg(long, default_value = "8")]
        hosts: usize,
    },

    /// Print a default configuration file
    Config,
}

#[derive(Serialize)]
struct MetricSummary {
    metric: String,
    tag_keys: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Replay { path } => {
            let search = replay(&config, &path)?;
            let summary: Vec<MetricSummary> = search
                .unique_metrics()
                .into_iter()
                .map(|metric| MetricSummary {
                    tag_keys: search.tag_keys_by_metric(&metric),
                    metric,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Expand { path, metric, tags } => {
            let search = replay(&config, &path)?;
            let mut query = TagQuery::new(metric);
            for tag in &tags {
                let (key, pattern) = tag
                    .split_once('=')
                    .with_context(|| format!("tag {:?} is not in key=pattern format", tag))?;
                query = query.tag(key.trim(), pattern);
            }
            let expanded = search.expand(&query)?;
            println!("{}", serde_json::to_string_pretty(&expanded)?);
        }
        Commands::Demo { hosts } => demo(&config, hosts).await?,
        Commands::Config => print!("{}", generate_default_config()),
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("invalid log level")?;

    let ansi = logging.file.is_none();
    let writer = log_writer(logging)?;
    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(ansi).with_writer(writer))
            .init();
    }
    Ok(())
}

/// Log destination: the configured file, appended to, or stderr
fn log_writer(logging: &LoggingConfig) -> anyhow::Result<BoxMakeWriter> {
    let Some(path) = &logging.file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {:?}", parent))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {:?}", path))?;
    Ok(BoxMakeWriter::new(Mutex::new(file)))
}

/// Ingest every line of `path` and publish a replica
fn replay(config: &Config, path: &Path) -> anyhow::Result<Search> {
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    let search = Search::new(config.search.to_runtime());

    let mut batch = Vec::new();
    let mut skipped = 0usize;
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Observation>(&line) {
            Ok(obs) => batch.push(obs),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping line {}: {}", n + 1, e);
            }
        }
    }

    search.ingest(&batch);
    search.refresh();

    tracing::info!(
        "Replayed {} observations ({} skipped): {}",
        batch.len(),
        skipped,
        search.stats()
    );
    Ok(search)
}

async fn demo(config: &Config, hosts: usize) -> anyhow::Result<()> {
    let runtime = config.search.to_runtime();
    let window = runtime.snapshot_window;
    let search = Arc::new(Search::new(runtime));
    let scheduler = search.start_snapshot_scheduler();

    tracing::info!(
        "Ingesting {} hosts; replica refreshes every {}s",
        hosts,
        window.as_secs()
    );

    let now = chrono::Utc::now().timestamp();
    for tick in 0..3i64 {
        let batch: Vec<Observation> = (0..hosts)
            .flat_map(|h| {
                let host = format!("web{:02}", h);
                let dc = if h % 2 == 0 { "east" } else { "west" };
                let ts = now + tick * 10;
                [
                    Observation::new("cpu.user", ts, (h as f64) + tick as f64)
                        .tag("host", host.clone())
                        .tag("dc", dc),
                    Observation::new("net.bytes", ts, 1000.0 * (tick + 1) as f64)
                        .tag("host", host)
                        .tag("dc", dc)
                        .tag("iface", "eth0"),
                ]
            })
            .collect();
        search.ingest(&batch);
    }

    tracing::info!("Metrics before first snapshot: {:?}", search.unique_metrics());
    tokio::time::sleep(window + Duration::from_secs(1)).await;
    tracing::info!("Metrics after first snapshot: {:?}", search.unique_metrics());

    tracing::info!(
        "Tag keys for net.bytes: {:?}",
        search.tag_keys_by_metric("net.bytes")
    );
    tracing::info!(
        "Metrics in dc=east: {:?}",
        search.metrics_by_tag_pair("dc", "east")
    );
    tracing::info!(
        "Hosts in dc=west: {:?}",
        search.filtered_tag_values_by_metric_tag_key(
            "cpu.user",
            "host",
            &TagSet::new().with("dc", "west")
        )
    );

    let expanded = search.expand(&TagQuery::new("cpu.user").tag("host", "web0*"))?;
    tracing::info!("Expanded host=web0*: {}", expanded.tags["host"]);

    let tags = TagSet::new()
        .with("host", "web00")
        .with("dc", "east")
        .with("iface", "eth0");
    if let Some(rate) = search.get_last("net.bytes", &tags, true)? {
        tracing::info!("net.bytes rate for web00: {:.1}/s", rate.value);
    }

    search.shutdown();
    if let Some(handle) = scheduler {
        handle.await?;
    }

    tracing::info!("Demo complete: {}", search.stats());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("tagsearch.log");
        let logging = LoggingConfig {
            file: Some(path.to_string_lossy().into_owned()),
            ..LoggingConfig::default()
        };

        log_writer(&logging)
            .unwrap()
            .make_writer()
            .write_all(b"first\n")
            .unwrap();
        log_writer(&logging)
            .unwrap()
            .make_writer()
            .write_all(b"second\n")
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let logging = LoggingConfig {
            file: Some(dir.path().to_string_lossy().into_owned()),
            ..LoggingConfig::default()
        };

        assert!(log_writer(&logging).is_err());
    }
}
