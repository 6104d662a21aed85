#![forbid(unsafe_code)]
//! tiersort-exec: the pipeline that ties the stages together.
//!
//! A [`Pipeline`] owns everything a sort needs (validated config, worker
//! pool, memory budget, network table) and is passed by reference; there is
//! no process-wide state. Each sort returns the sorted tuples with a
//! [`SortReport`] whose output digest makes runs comparable.

pub mod metrics;
pub mod pipeline;
pub mod report;

pub use pipeline::{JoinOutput, Pipeline, SortedRelation};
pub use report::{JoinReport, ReportId, SortReport, StageTiming};
