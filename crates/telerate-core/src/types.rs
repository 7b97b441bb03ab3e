//! Sample and record types shared by producers, the aggregator, and sinks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{fingerprint, Fingerprint};

/// Tag set of a series. Ordered so that fingerprinting never needs a sort.
pub type Tags = BTreeMap<String, String>;

/// Field set of a sample or derived record.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value.
///
/// Untagged on the wire: a JSON integer becomes `Integer` (or
/// `UnsignedInteger` above `i64::MAX`), a JSON float becomes `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    /// Short name of the value's kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "integer",
            FieldValue::UnsignedInteger(_) => "unsigned",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::String(_) => "string",
        }
    }

    /// Widen an integral value for overflow-free subtraction.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            FieldValue::Integer(v) => Some(*v as i128),
            FieldValue::UnsignedInteger(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, FieldValue::Integer(_) | FieldValue::UnsignedInteger(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}i"),
            FieldValue::UnsignedInteger(v) => write!(f, "{v}u"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Boolean(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UnsignedInteger(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// A point-in-time observation of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub fields: Fields,
    /// Unix timestamp in nanoseconds.
    pub timestamp: i64,
}

impl Sample {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            tags: Tags::new(),
            fields: Fields::new(),
            timestamp,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Identity of the series this sample belongs to.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.name, &self.tags)
    }

    /// Seconds elapsed from `earlier` to this sample. Negative when
    /// `earlier` carries a later timestamp.
    pub fn secs_since(&self, earlier: &Sample) -> f64 {
        let delta_ns = self.timestamp as i128 - earlier.timestamp as i128;
        delta_ns as f64 / 1e9
    }
}

/// The single aggregated output produced for one series per flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub name: String,
    pub tags: Tags,
    pub fields: Fields,
}

/// Nanoseconds for a whole number of seconds.
pub const fn secs(s: i64) -> i64 {
    s * 1_000_000_000
}
