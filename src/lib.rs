//! # tagsearch
//!
//! In-memory tag index for time-series identity discovery. Fed by a stream of
//! metric observations, it answers:
//!
//! - which metrics exist for a tag pair
//! - which tag keys exist for a metric
//! - which tag values exist for a metric and key, optionally only recent ones
//! - what the last value, or rate, of an exact series is
//!
//! Writes go to a locked live index; queries read an immutable replica that is
//! refreshed at most once per snapshot window, so reads never wait on ingest.
//!
//! ## Modules
//!
//! - [`index`]: Presence sets, reverse indices and the last-value store
//! - [`search`]: Ingestion, snapshot scheduling and queries
//! - [`types`]: Observations, tag sets and series records
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use tagsearch::{Observation, Search, TagQuery, TagSet};
//!
//! let search = Search::default();
//! search.ingest(&[
//!     Observation::new("cpu", 100, 1.0).tag("host", "web01").tag("dc", "east"),
//!     Observation::new("cpu", 110, 3.0).tag("host", "web01").tag("dc", "east"),
//!     Observation::new("cpu", 110, 5.0).tag("host", "db01").tag("dc", "east"),
//! ]);
//! search.refresh();
//!
//! assert_eq!(search.metrics_by_tag_pair("dc", "east"), vec!["cpu"]);
//! assert_eq!(
//!     search.tag_values_by_metric_tag_key("cpu", "host", Duration::ZERO),
//!     vec!["db01", "web01"]
//! );
//!
//! let expanded = search.expand(&TagQuery::new("cpu").tag("host", "web*")).unwrap();
//! assert_eq!(expanded.tags["host"], "web01");
//!
//! let tags = TagSet::new().with("host", "web01").with("dc", "east");
//! let rate = search.get_last("cpu", &tags, true).unwrap().unwrap();
//! assert!((rate.value - 0.2).abs() < 1e-9);
//! ```

pub mod config;
pub mod index;
pub mod search;
pub mod types;

pub use types::{series_key, MetricTagSet, Observation, SampleValue, TagQuery, TagSet};

pub use index::{IndexSnapshot, IndexStats};

pub use search::{
    wildcard_match, LastValue, SchedulerState, Search, SearchConfig, SearchError, SearchResult,
    DEFAULT_SNAPSHOT_WINDOW,
};

pub use config::{Config, ConfigError, LoggingConfig, SearchSection};
