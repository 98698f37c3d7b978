//! Core data types for the tag index
//!
//! - `TagSet`: ordered tag key → value mapping with a deterministic string form
//! - `MetricTagSet`: a metric plus its full tag set (one series)
//! - `SampleValue`: the payload of an observation
//! - `Observation`: one incoming measurement
//! - `TagQuery`: a metric plus pipe-delimited tag value patterns, input to `expand`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Tag key → value mapping qualifying a metric into a series
///
/// Backed by a `BTreeMap` so that iteration, and therefore the string form,
/// is always in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder method: add a tag
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if every (key, value) in `filters` is present and equal in this set
    pub fn is_superset_of(&self, filters: &TagSet) -> bool {
        filters
            .iter()
            .all(|(key, value)| self.get(key) == Some(value))
    }
}

impl fmt::Display for TagSet {
    /// Renders as `{k1=v1,k2=v2}` in key order
    ///
    /// `\`, `,`, `=`, `{` and `}` inside keys and values are backslash-escaped
    /// so distinct tag sets never render the same.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write_escaped(f, key)?;
            f.write_str("=")?;
            write_escaped(f, value)?;
        }
        f.write_str("}")
    }
}

fn write_escaped(out: &mut impl fmt::Write, s: &str) -> fmt::Result {
    for c in s.chars() {
        if matches!(c, '\\' | ',' | '=' | '{' | '}') {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    Ok(())
}

/// One series: a metric name plus its complete tag set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricTagSet {
    pub metric: String,
    pub tags: TagSet,
}

impl MetricTagSet {
    pub fn new(metric: impl Into<String>, tags: TagSet) -> Self {
        Self {
            metric: metric.into(),
            tags,
        }
    }

    /// Series identity key: the metric followed by the tag set string form
    ///
    /// `cpu{dc=east,host=a}`
    pub fn key(&self) -> String {
        series_key(&self.metric, &self.tags)
    }
}

/// Series identity key for a metric and tag set without building a `MetricTagSet`
///
/// The metric is escaped like tag keys and values.
pub fn series_key(metric: &str, tags: &TagSet) -> String {
    let mut key = String::with_capacity(metric.len() + 2);
    // writing to a String cannot fail
    let _ = write_escaped(&mut key, metric);
    let _ = write!(key, "{}", tags);
    key
}

/// Value carried by an observation
///
/// Only `Float` values take part in last-value and rate lookups; anything
/// else is indexed for discovery but reported as non-numeric on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Float(f64),
    Text(String),
}

impl SampleValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Float(v) => Some(*v),
            SampleValue::Text(_) => None,
        }
    }
}

impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        SampleValue::Float(v)
    }
}

impl From<&str> for SampleValue {
    fn from(v: &str) -> Self {
        SampleValue::Text(v.to_string())
    }
}

/// A single incoming measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Metric name
    pub metric: String,
    /// Tags identifying the series
    #[serde(default)]
    pub tags: TagSet,
    /// Sample time, unix seconds
    pub timestamp: i64,
    /// Measured value
    pub value: SampleValue,
}

impl Observation {
    pub fn new(metric: impl Into<String>, timestamp: i64, value: impl Into<SampleValue>) -> Self {
        Self {
            metric: metric.into(),
            tags: TagSet::new(),
            timestamp,
            value: value.into(),
        }
    }

    /// Builder method: add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    pub fn series_key(&self) -> String {
        series_key(&self.metric, &self.tags)
    }
}

/// Query shape consumed by wildcard expansion
///
/// Each tag value is a `|`-separated list of literals or `*` patterns,
/// e.g. `host = "web-*|db01"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagQuery {
    pub metric: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl TagQuery {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Builder method: add a tag pattern
    pub fn tag(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.tags.insert(key.into(), pattern.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagset_display_is_sorted() {
        let tags = TagSet::new().with("host", "a").with("dc", "east");
        assert_eq!(tags.to_string(), "{dc=east,host=a}");
        assert_eq!(TagSet::new().to_string(), "{}");
    }

    #[test]
    fn test_series_key_is_order_independent() {
        let a = Observation::new("cpu", 1, 1.0).tag("host", "a").tag("dc", "east");
        let b = Observation::new("cpu", 2, 2.0).tag("dc", "east").tag("host", "a");
        assert_eq!(a.series_key(), b.series_key());
        assert_eq!(a.series_key(), "cpu{dc=east,host=a}");
    }

    #[test]
    fn test_separators_in_values_do_not_collide() {
        let packed = TagSet::new().with("a", "1,b=2");
        let split = TagSet::new().with("a", "1").with("b", "2");

        assert_eq!(packed.to_string(), r"{a=1\,b\=2}");
        assert_eq!(split.to_string(), "{a=1,b=2}");
        assert_ne!(series_key("cpu", &packed), series_key("cpu", &split));

        let braces = TagSet::new().with("k{", "}v\\");
        assert_eq!(braces.to_string(), r"{k\{=\}v\\}");
    }

    #[test]
    fn test_metric_braces_do_not_collide() {
        let tagged = series_key("cpu", &TagSet::new().with("a", "1"));
        let bare = series_key("cpu{a=1}", &TagSet::new());
        assert_ne!(tagged, bare);
        assert_eq!(bare, r"cpu\{a\=1\}{}");
    }

    #[test]
    fn test_superset() {
        let tags = TagSet::new().with("host", "a").with("dc", "east");

        assert!(tags.is_superset_of(&TagSet::new()));
        assert!(tags.is_superset_of(&TagSet::new().with("dc", "east")));
        assert!(!tags.is_superset_of(&TagSet::new().with("dc", "west")));
        assert!(!tags.is_superset_of(&TagSet::new().with("rack", "1")));
    }

    #[test]
    fn test_sample_value_from_json() {
        let obs: Observation = serde_json::from_str(
            r#"{"metric":"cpu","tags":{"host":"a"},"timestamp":100,"value":1.5}"#,
        )
        .unwrap();
        assert_eq!(obs.value, SampleValue::Float(1.5));
        assert_eq!(obs.tags.get("host"), Some("a"));

        let obs: Observation =
            serde_json::from_str(r#"{"metric":"state","timestamp":100,"value":"up"}"#).unwrap();
        assert_eq!(obs.value.as_f64(), None);
        assert!(obs.tags.is_empty());
    }
}
