//! JSON-lines output for samples and derived records.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use tracing::warn;

use telerate_aggregator::Sink;
use telerate_core::{Fields, Sample, Tags};

/// Writes each derived record as one JSON object per line, stamped with
/// the time it was emitted.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn add_fields(&mut self, name: &str, fields: Fields, tags: Tags) {
        let line = json!({
            "name": name,
            "tags": tags,
            "fields": fields,
            "timestamp": epoch_nanos(),
        });
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!(error = %e, series = %name, "failed to write rate record");
        }
    }
}

/// Forward an original sample unchanged.
pub fn write_sample<W: Write>(out: &mut W, sample: &Sample) -> std::io::Result<()> {
    let line = serde_json::to_string(sample)?;
    writeln!(out, "{line}")?;
    out.flush()
}

fn epoch_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
