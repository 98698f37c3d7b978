//! Search error types
//!
//! Unknown metrics, tag keys and series are not errors; they resolve to empty
//! results. Only the conditions below are reported.

use thiserror::Error;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// Wildcard pattern did not compile to a valid regular expression
    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A tag key's patterns resolved to no values during expansion
    #[error("No tags matching {key}={pattern}")]
    NoMatch { key: String, pattern: String },

    /// Stored last value is not a float
    #[error("Last value for {series} is not numeric")]
    NotNumeric { series: String },

    /// Rate requested with fewer than two usable samples
    #[error("Need two samples to compute a rate for {series}")]
    InsufficientSamples { series: String },
}

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;
