//! Error types for the tick-bars system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejection of a single raw trade payload during normalization.
///
/// A failed normalization never touches bar state; the caller decides whether
/// to keep consuming the stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// The alias table does not name a required field.
    #[error("alias table must contain a '{0}' key")]
    MissingAlias(&'static str),

    /// The payload lacks a required field, or the value is empty.
    #[error("field '{field}' is missing or empty")]
    MissingField { field: String },

    /// The timestamp could not be interpreted.
    #[error("field '{field}' is not a timestamp or parseable date: {value}")]
    Unparseable { field: String, value: String },

    /// Price or quantity is not numerically coercible.
    #[error("field '{field}' must be numeric, got {value}")]
    NonNumeric { field: String, value: String },

    /// Side value is not "buy"/"sell", or maker value is not a boolean.
    #[error("invalid side in '{field}': {value}")]
    InvalidSide { field: String, value: String },

    /// Neither the side nor the maker field resolved a side.
    #[error("trade side could not be determined")]
    SideUndetermined,

    /// Symbol is absent or not a string.
    #[error("field '{field}' must be a string symbol")]
    InvalidSymbol { field: String },
}

/// Main error type for the tick-bars system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A raw trade was rejected.
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Resample interval string is malformed.
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Dollar size string is malformed.
    #[error("Invalid dollar size: {0}")]
    InvalidDollarSize(String),

    /// OHLC columns are absent or non-numeric.
    #[error("Non-numeric data in OHLC columns: {0}")]
    NonNumericColumns(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid interval error.
    pub fn invalid_interval(msg: impl Into<String>) -> Self {
        Error::InvalidInterval(msg.into())
    }

    /// Create an invalid dollar size error.
    pub fn invalid_dollar_size(msg: impl Into<String>) -> Self {
        Error::InvalidDollarSize(msg.into())
    }

    /// Create a non-numeric columns error.
    pub fn non_numeric_columns(msg: impl Into<String>) -> Self {
        Error::NonNumericColumns(msg.into())
    }
}
