//! Error types for rate computation and configuration loading.

use thiserror::Error;

/// Failure to rate a single field of a single series.
///
/// Never fatal to a flush: the engine logs it and moves on to the next
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("field {field:?} missing from {which} sample of series {series:?}")]
    MissingField {
        series: String,
        field: String,
        which: &'static str,
    },

    #[error("field {field:?} of series {series:?} has unsupported type {kind}")]
    UnsupportedFieldType {
        series: String,
        field: String,
        kind: &'static str,
    },

    #[error("field {field:?} of series {series:?} changed type from {first} to {last}")]
    TypeMismatch {
        series: String,
        field: String,
        first: &'static str,
        last: &'static str,
    },
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating a [`RateConfig`](crate::RateConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid period {0:?}")]
    InvalidPeriod(String),

    #[error("series {series:?} lists field {field:?} more than once")]
    DuplicateField { series: String, field: String },

    #[error("series {0:?} lists an empty field name")]
    EmptyFieldName(String),
}
