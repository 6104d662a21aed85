//! The relation-source seam.
//!
//! The storage layer that owns relations is an external collaborator. The
//! engine depends only on cardinality and positional reads; it never writes
//! back to a source.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::tuple::Key;

/// Width of the little-endian key prefix in [`EncodedRelation`] records.
pub const KEY_PREFIX_LEN: usize = std::mem::size_of::<Key>();

/// Read-only, randomly addressable relation.
pub trait RelationSource: Send + Sync {
    /// Total tuple count.
    fn cardinality(&self) -> usize;

    /// Decode the tuple at `position` into `(key, payload)`.
    ///
    /// Implementations return [`Error::Input`] for unreadable records; the
    /// engine aborts instead of skipping them.
    fn read(&self, position: usize) -> Result<(Key, Bytes)>;
}

/// Owned, already-decoded records. Mainly used by tests and benchmarks.
#[derive(Debug, Clone, Default)]
pub struct MemRelation {
    records: Vec<(Key, Bytes)>,
}

impl MemRelation {
    pub fn new(records: Vec<(Key, Bytes)>) -> Self {
        Self { records }
    }

    /// Records with empty payloads.
    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            records: keys.into_iter().map(|k| (k, Bytes::new())).collect(),
        }
    }

    pub fn push(&mut self, key: Key, payload: impl Into<Bytes>) {
        self.records.push((key, payload.into()));
    }

    pub fn records(&self) -> &[(Key, Bytes)] {
        &self.records
    }
}

impl<P: Into<Bytes>> FromIterator<(Key, P)> for MemRelation {
    fn from_iter<I: IntoIterator<Item = (Key, P)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|(k, p)| (k, p.into())).collect(),
        }
    }
}

impl RelationSource for MemRelation {
    fn cardinality(&self) -> usize {
        self.records.len()
    }

    fn read(&self, position: usize) -> Result<(Key, Bytes)> {
        self.records
            .get(position)
            .cloned()
            .ok_or_else(|| Error::Input {
                position,
                reason: format!("position past cardinality {}", self.records.len()),
            })
    }
}

/// Raw byte records: `[key: i64 LE][payload ...]`.
#[derive(Debug, Clone, Default)]
pub struct EncodedRelation {
    records: Vec<Bytes>,
}

impl EncodedRelation {
    pub fn new(records: Vec<Bytes>) -> Self {
        Self { records }
    }

    /// Encode one record in the layout `read` expects.
    pub fn encode(key: Key, payload: &[u8]) -> Bytes {
        let mut buf = Vec::with_capacity(KEY_PREFIX_LEN + payload.len());
        buf.extend_from_slice(&key.to_le_bytes());
        buf.extend_from_slice(payload);
        Bytes::from(buf)
    }
}

impl RelationSource for EncodedRelation {
    fn cardinality(&self) -> usize {
        self.records.len()
    }

    fn read(&self, position: usize) -> Result<(Key, Bytes)> {
        let record = self.records.get(position).ok_or_else(|| Error::Input {
            position,
            reason: format!("position past cardinality {}", self.records.len()),
        })?;
        if record.len() < KEY_PREFIX_LEN {
            return Err(Error::Input {
                position,
                reason: format!(
                    "record of {} bytes is shorter than the {KEY_PREFIX_LEN}-byte key prefix",
                    record.len()
                ),
            });
        }
        let mut prefix = [0u8; KEY_PREFIX_LEN];
        prefix.copy_from_slice(&record[..KEY_PREFIX_LEN]);
        Ok((Key::from_le_bytes(prefix), record.slice(KEY_PREFIX_LEN..)))
    }
}
