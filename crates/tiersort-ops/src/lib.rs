#![forbid(unsafe_code)]
//! tiersort-ops: the sorting and joining stages.
//!
//! Design intent:
//! - Stages are synchronous task bodies; parallelism comes from handing
//!   disjoint `&mut` regions to `tiersort-sched::WorkerPool`.
//! - Transient scratch goes through `tiersort-mem` guards so the pipeline's
//!   budget is enforced.
//! - The L1 and L2 networks are data-oblivious: their compare-exchange
//!   sequence depends only on lengths, never on key values.

pub mod bitonic;
pub mod join;
pub mod merge;
pub mod network;
pub mod plan;
pub mod traits;

pub use bitonic::BitonicMergeStage;
pub use join::{JoinedTuple, MergeJoinIter, MergeJoinStage};
pub use merge::ExternalMergeStage;
pub use network::{NetworkTable, RegisterSortStage, SortingNetwork};
pub use plan::Footprint;
pub use traits::{reserve_scratch, SortStage, StageContext};
