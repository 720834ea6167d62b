//! Error types for the SexaQ toolkit

use thiserror::Error;

/// SexaQ error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Validation error (malformed input or configuration)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bin edges are not a valid binning
    #[error("invalid binning: {0}")]
    InvalidBinning(String),

    /// Normalization of a histogram whose integral is zero
    #[error("cannot normalize empty histogram '{name}'")]
    EmptyHistogram {
        /// Histogram name.
        name: String,
    },

    /// Two histograms combined bin-wise do not share bin edges
    #[error("binning mismatch between '{left}' and '{right}'")]
    BinningMismatch {
        /// First histogram name.
        left: String,
        /// Second histogram name.
        right: String,
    },

    /// Fill addressed to a histogram that was never registered
    #[error("unknown histogram: {0}")]
    UnknownHistogram(String),

    /// Row index past the end of a dataset
    #[error("row {row} out of range (dataset has {rows} rows)")]
    RowOutOfRange {
        /// Requested row.
        row: usize,
        /// Rows available.
        rows: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
