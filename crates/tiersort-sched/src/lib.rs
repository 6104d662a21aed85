#![forbid(unsafe_code)]
//! tiersort-sched: planning and scheduling for the tiered sort.
//!
//! Responsibilities:
//! - Derive the per-relation plan (L2 rounds, run count `R`, fan-in `M`,
//!   L3 strategy and pass count) from a validated `SortConfig`.
//! - Own the fixed worker pool and run one stage at a time on it; returning
//!   from `WorkerPool::run_stage` is the barrier between stages.
//! - Provide debug-time verification helpers for run layouts.
//!
//! **No sorting logic** here. The ops crate supplies the task bodies.

pub mod failpoints;
pub mod plan;
pub mod pool;
pub mod verify;

pub use plan::{passes_needed, resolve_strategy, ResolvedStrategy, SortPlan};
pub use pool::WorkerPool;
