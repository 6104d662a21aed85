#![forbid(unsafe_code)]
//! tiersort-mem: hard memory budgeting for transient stage buffers.
//!
//! Concrete implementations of the interfaces in `tiersort-core::budget`.
//! Every scratch buffer a stage task allocates is reserved here first, so an
//! undersized budget fails the task instead of overcommitting the process.

pub mod error;
pub mod guard;
pub mod pool;
pub mod tracking;

pub use error::{Error, Result};
pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use pool::{tuple_slots_bytes, TupleBuf};
pub use tracking::PeakTracker;
