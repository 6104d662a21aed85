//! Strongly-typed identifiers.
//!
//! Downstream crates should *not* use raw integers for IDs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Default,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            Ord,
            PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(TupleId);
new_id!(TaskId);

impl TupleId {
    /// Reserved for padding tuples; sorts after every id a source can assign.
    pub const SENTINEL: TupleId = TupleId(u64::MAX);

    /// Id for the tuple read from `position` of its source relation.
    pub fn from_position(position: usize) -> Self {
        Self(position as u64)
    }
}
