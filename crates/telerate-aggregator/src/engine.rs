//! Rate engine: turns one window of samples into per-series rate records.
//!
//! For every bucket the derived record starts as a copy of the newest
//! sample's fields. Each configured field is then replaced by its rate
//! between the oldest and newest sample:
//!
//! ```text
//! dt = last.timestamp - first.timestamp   (seconds)
//! dv = last.value     - first.value
//!
//! dt >  0  →  <field>_per_second = dv / dt
//! dt <= 0  →  <field>_rate       = 0
//! ```

use tracing::{debug, warn};

use telerate_core::{DerivedRecord, FieldValue, RateError, RateSpec, Sample};

use crate::cache::WindowedCache;

/// Suffix of a rate computed over a positive interval.
pub const PER_SECOND_SUFFIX: &str = "_per_second";
/// Suffix of the zero emitted for an empty or inverted interval.
pub const DEGENERATE_SUFFIX: &str = "_rate";

/// Stateless apart from the rate spec it was built with.
#[derive(Debug, Clone, Default)]
pub struct RateEngine {
    spec: RateSpec,
}

impl RateEngine {
    pub fn new(spec: RateSpec) -> Self {
        Self { spec }
    }

    /// Derive one record per series in `cache`, ordered by fingerprint.
    ///
    /// Does not modify the cache, so flushing twice without new samples
    /// yields the same output.
    pub fn flush(&self, cache: &WindowedCache) -> Vec<DerivedRecord> {
        cache
            .keys()
            .into_iter()
            .filter_map(|key| {
                let first = cache.first(key)?;
                let last = cache.last(key)?;
                Some(self.derive(first, last))
            })
            .collect()
    }

    /// Derive the record for a single bucket.
    pub fn derive(&self, first: &Sample, last: &Sample) -> DerivedRecord {
        let mut fields = last.fields.clone();

        for field in self.spec.fields_for(&first.name) {
            // The raw value is replaced by its rate, never kept alongside.
            fields.remove(field);

            match rate_of(field, first, last) {
                Ok((name, value)) => {
                    fields.insert(name, value);
                }
                Err(e) => {
                    warn!(series = %first.name, %field, error = %e, "skipping rate field");
                }
            }
        }

        DerivedRecord {
            name: first.name.clone(),
            tags: first.tags.clone(),
            fields,
        }
    }
}

/// Compute the output field name and value for one rated field.
fn rate_of(
    field: &str,
    first: &Sample,
    last: &Sample,
) -> Result<(String, FieldValue), RateError> {
    let first_value = lookup(field, first, "first")?;
    let last_value = lookup(field, last, "last")?;

    // The first sample's value decides how the field is rated.
    let delta_v = match (first_value, last_value) {
        (FieldValue::Float(a), FieldValue::Float(b)) => b - a,
        // Integral values widen to i128, so the difference cannot overflow.
        (a, b) => match (a.as_i128(), b.as_i128()) {
            (Some(x), Some(y)) => (y - x) as f64,
            _ if !is_numeric(a) => {
                return Err(RateError::UnsupportedFieldType {
                    series: first.name.clone(),
                    field: field.to_string(),
                    kind: a.kind(),
                });
            }
            _ => {
                return Err(RateError::TypeMismatch {
                    series: first.name.clone(),
                    field: field.to_string(),
                    first: a.kind(),
                    last: b.kind(),
                });
            }
        },
    };

    let delta_t = last.secs_since(first);
    if delta_t <= 0.0 {
        debug!(series = %first.name, %field, delta_t, "degenerate window, rate is zero");
        return Ok((format!("{field}{DEGENERATE_SUFFIX}"), FieldValue::Float(0.0)));
    }

    Ok((
        format!("{field}{PER_SECOND_SUFFIX}"),
        FieldValue::Float(delta_v / delta_t),
    ))
}

fn lookup<'a>(
    field: &str,
    sample: &'a Sample,
    which: &'static str,
) -> Result<&'a FieldValue, RateError> {
    sample.fields.get(field).ok_or_else(|| RateError::MissingField {
        series: sample.name.clone(),
        field: field.to_string(),
        which,
    })
}

fn is_numeric(value: &FieldValue) -> bool {
    value.is_integral() || matches!(value, FieldValue::Float(_))
}
