#![forbid(unsafe_code)]
//! tiersort-core: shared vocabulary for the tiered sort engine.
//!
//! Everything downstream crates pass between stages lives here: tuples and
//! their sort keys, run metadata, the padding pair used by the power-of-two
//! stages, configuration, the error taxonomy, and the relation-source seam.
//!
//! **No threads, no allocation policy, no I/O** here. Scheduling lives in
//! `tiersort-sched`, the algorithms in `tiersort-ops`.

pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod relation;
pub mod run;
pub mod stage;
pub mod tuple;

/// Engine version string stamped into reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{MergeStrategy, SortConfig};
pub use error::{Error, ErrorKind, Result};
pub use tuple::{Key, SortKey, Tuple};
