//! Series identity: a 64-bit fingerprint over name and tag set.
//!
//! Fields and timestamps never contribute, so every sample of one series
//! lands in the same bucket. Collisions are possible in principle and are
//! not detected.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::Tags;

/// Bucketing key for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0.to_be_bytes()))
    }
}

/// Compute the fingerprint of a series.
///
/// Every component is followed by a NUL separator so that shifting bytes
/// between a key and its value yields a different digest.
pub fn fingerprint(name: &str, tags: &Tags) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    for (key, value) in tags {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Fingerprint(u64::from_be_bytes(head))
}
