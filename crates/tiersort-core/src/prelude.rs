//! Convenient re-exports for downstream crates.

pub use crate::budget::{BudgetGuard, MemoryBudget};
pub use crate::config::{MergeStrategy, SortConfig};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::id::{TaskId, TupleId};
pub use crate::relation::{EncodedRelation, MemRelation, RelationSource};
pub use crate::run::{layout_runs, Padding, RunMeta, Tier};
pub use crate::stage::Stage;
pub use crate::tuple::{is_sorted, Key, SortKey, Tuple};
