//! telerate-core: shared types for the telerate rate aggregator.
//!
//! Defines the sample model produced by collectors, the series
//! fingerprint used to bucket samples, and the TOML configuration that
//! tells the aggregator which fields to turn into per-second rates.
//!
//! # Data model
//!
//! ```text
//! Sample { name, tags, fields, timestamp }
//!   └── fingerprint(name, tags) → Fingerprint(u64)
//!
//! RateConfig (TOML)
//!   └── rate_spec() → RateSpec { series → [field, ...] }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::{RateConfig, RateSpec};
pub use error::{ConfigError, ConfigResult, RateError};
pub use identity::{fingerprint, Fingerprint};
pub use types::*;
