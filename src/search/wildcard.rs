//! Wildcard matching and tag query expansion
//!
//! Patterns use `*` for any run of characters and are anchored at both ends.
//! `.` is matched literally. Every other character is handed to the regex
//! engine unchanged, so `web[12]*` still works as a character class.

use crate::search::error::{SearchError, SearchResult};
use crate::types::TagQuery;
use regex::Regex;
use std::time::Duration;

use super::Search;

/// Compile a wildcard pattern into an anchored regex
fn compile(pattern: &str) -> SearchResult<Regex> {
    let translated = format!("^{}$", pattern.replace('.', r"\.").replace('*', ".*"));
    Regex::new(&translated).map_err(|source| SearchError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Candidates fully matching `pattern`, in their original order
pub fn wildcard_match(pattern: &str, candidates: &[String]) -> SearchResult<Vec<String>> {
    let re = compile(pattern)?;
    Ok(candidates
        .iter()
        .filter(|c| re.is_match(c))
        .cloned()
        .collect())
}

impl Search {
    /// Resolve wildcard tag patterns in `query` against known tag values
    ///
    /// Each tag value is split on `|`; segments that are `*` or contain no
    /// wildcard pass through as-is, the rest are replaced by the matching tag
    /// values of the query's metric. The input is left untouched on error.
    pub fn expand(&self, query: &TagQuery) -> SearchResult<TagQuery> {
        let mut expanded = query.clone();

        for (key, patterns) in expanded.tags.iter_mut() {
            let mut resolved: Vec<String> = Vec::new();

            for segment in patterns.split('|') {
                let segment = segment.trim();
                if segment == "*" || !segment.contains('*') {
                    resolved.push(segment.to_string());
                    continue;
                }
                let candidates =
                    self.tag_values_by_metric_tag_key(&query.metric, key, Duration::ZERO);
                resolved.extend(wildcard_match(segment, &candidates)?);
            }

            if resolved.is_empty() {
                return Err(SearchError::NoMatch {
                    key: key.clone(),
                    pattern: patterns.clone(),
                });
            }

            tracing::trace!(
                metric = %query.metric,
                %key,
                alternatives = resolved.len(),
                "expanded tag pattern"
            );
            *patterns = resolved.join("|");
        }

        Ok(expanded)
    }
}
