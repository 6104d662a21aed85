//! Tuples and the total order every stage sorts by.
//!
//! A tuple is ordered by its [`SortKey`]: the numeric key first, then the
//! engine-assigned [`TupleId`]. Ids are unique within a relation, so the order
//! is total and every correct sort or merge produces the same sequence.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::id::TupleId;

/// Join/sort key. Numeric and totally ordered.
pub type Key = i64;

/// `(key, id)` pair; the derived `Ord` compares `key` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub key: Key,
    pub id: TupleId,
}

impl SortKey {
    pub const MAX: SortKey = SortKey {
        key: Key::MAX,
        id: TupleId::SENTINEL,
    };
}

/// Key plus opaque payload. Tuples are immutable once read from the source;
/// stages only move them between slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuple {
    pub key: Key,
    pub id: TupleId,
    pub payload: Bytes,
}

impl Tuple {
    pub fn new(key: Key, id: TupleId, payload: impl Into<Bytes>) -> Self {
        Self {
            key,
            id,
            payload: payload.into(),
        }
    }

    /// Padding tuple carrying the maximum key. Compares greater than or equal
    /// to every real tuple, so it always settles at the tail of a network.
    pub fn sentinel() -> Self {
        Self {
            key: Key::MAX,
            id: TupleId::SENTINEL,
            payload: Bytes::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == TupleId::SENTINEL
    }

    #[inline(always)]
    pub fn sort_key(&self) -> SortKey {
        SortKey {
            key: self.key,
            id: self.id,
        }
    }

    /// Strictly-before in sort order.
    #[inline(always)]
    pub fn precedes(&self, other: &Tuple) -> bool {
        self.sort_key() < other.sort_key()
    }
}

/// True if `tuples` is non-decreasing by sort key.
pub fn is_sorted(tuples: &[Tuple]) -> bool {
    tuples.windows(2).all(|w| !w[1].precedes(&w[0]))
}
