//! Output side of a flush.

use telerate_core::{DerivedRecord, Fields, Tags};

/// Accepts derived records for eventual export.
///
/// Delivery guarantees are the sink's own business; the aggregator only
/// hands records over one at a time.
pub trait Sink {
    fn add_fields(&mut self, name: &str, fields: Fields, tags: Tags);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn add_fields(&mut self, name: &str, fields: Fields, tags: Tags) {
        (**self).add_fields(name, fields, tags);
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn add_fields(&mut self, name: &str, fields: Fields, tags: Tags) {
        (**self).add_fields(name, fields, tags);
    }
}

/// In-memory sink that keeps records in the order they were added.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    records: Vec<DerivedRecord>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[DerivedRecord] {
        &self.records
    }

    /// First record with the given name and exact tag set.
    pub fn find(&self, name: &str, tags: &Tags) -> Option<&DerivedRecord> {
        self.records
            .iter()
            .find(|r| r.name == name && &r.tags == tags)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Sink for Accumulator {
    fn add_fields(&mut self, name: &str, fields: Fields, tags: Tags) {
        self.records.push(DerivedRecord {
            name: name.to_string(),
            tags,
            fields,
        });
    }
}
