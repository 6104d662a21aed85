#![forbid(unsafe_code)]
//! tiersort: parallel three-level external sort feeding a sort-merge join.
//!
//! ```no_run
//! use tiersort::{MemRelation, Pipeline, SortConfig};
//!
//! let pipeline = Pipeline::new(SortConfig::default())?;
//! let left: MemRelation = [(1, "a"), (1, "b"), (2, "c")].into_iter().collect();
//! let right: MemRelation = [(1, "x"), (2, "y"), (2, "z")].into_iter().collect();
//! let joined = pipeline.sort_merge_join(&left, &right)?;
//! assert_eq!(joined.tuples.len(), 4);
//! # Ok::<(), tiersort::Error>(())
//! ```

pub use tiersort_core::config::{MergeStrategy, SortConfig, DEFAULT_FAN_IN, SUPPORTED_BLOCK_SIZES};
pub use tiersort_core::error::{Error, ErrorKind, Result};
pub use tiersort_core::hash::{digest_tuples, Hash256};
pub use tiersort_core::id::TupleId;
pub use tiersort_core::relation::{EncodedRelation, MemRelation, RelationSource};
pub use tiersort_core::run::{Padding, RunMeta, Tier};
pub use tiersort_core::stage::Stage;
pub use tiersort_core::tuple::{is_sorted, Key, SortKey, Tuple};

pub use tiersort_exec::{JoinOutput, JoinReport, Pipeline, SortReport, SortedRelation, StageTiming};

pub use tiersort_ops::join::{count_matches, merge_join, JoinedTuple, MergeJoinIter};
pub use tiersort_ops::network::{NetworkTable, SortingNetwork};

pub use tiersort_sched::plan::{passes_needed, ResolvedStrategy, SortPlan};

/// Named fault injection for task-failure testing.
#[cfg(feature = "failpoints")]
pub mod failpoints {
    pub use tiersort_sched::failpoints::{arm, disarm, is_armed};
}
