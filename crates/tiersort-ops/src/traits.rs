//! Stage trait + the context every stage runs against.
//!
//! The pipeline walks its stages strictly in order, calling `execute` on the
//! next stage only after the previous one returned: that return is the
//! barrier. A stage takes the sorted-run layout its predecessor produced and
//! returns the layout it produced.

use tiersort_core::budget::MemoryBudget;
use tiersort_core::error::Result;
use tiersort_core::run::RunMeta;
use tiersort_core::stage::Stage;
use tiersort_core::tuple::Tuple;
use tiersort_mem::guard::BudgetGuardImpl;
use tiersort_sched::plan::SortPlan;
use tiersort_sched::pool::WorkerPool;

use crate::plan::Footprint;

/// Shared, read-only handles a stage needs.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub pool: &'a WorkerPool,
    pub budget: &'a dyn MemoryBudget<Guard = BudgetGuardImpl>,
}

impl<'a> StageContext<'a> {
    pub fn new(pool: &'a WorkerPool, budget: &'a dyn MemoryBudget<Guard = BudgetGuardImpl>) -> Self {
        Self { pool, budget }
    }
}

/// Reserve `bytes` of scratch for a task of `stage`, failing the task if the
/// budget is exhausted.
pub fn reserve_scratch<B>(
    budget: &B,
    stage: Stage,
    bytes: usize,
    tag: &'static str,
) -> Result<BudgetGuardImpl>
where
    B: MemoryBudget<Guard = BudgetGuardImpl> + ?Sized,
{
    budget.try_acquire(bytes, tag).ok_or_else(|| {
        tiersort_mem::Error::BudgetExceeded {
            tag,
            requested: bytes,
            capacity: budget.capacity_bytes(),
            used: budget.used_bytes(),
        }
        .into_task_failure(stage)
    })
}

/// Trait that the three sorting levels implement.
///
/// Invariants:
/// - `execute` leaves `buf` a permutation of what it received.
/// - Every run in the returned layout is sorted, and the layout tiles `buf`.
/// - Tasks only write the region they were handed.
pub trait SortStage: Send + Sync {
    /// Stable stage label.
    fn stage(&self) -> Stage;

    /// Scratch model used for the up-front feasibility check.
    fn memory_need(&self, plan: &SortPlan) -> Footprint;

    /// Run the stage over `buf`, whose current sorted-run layout is `runs`.
    fn execute(
        &self,
        ctx: &StageContext<'_>,
        buf: &mut Vec<Tuple>,
        runs: Vec<RunMeta>,
    ) -> Result<Vec<RunMeta>>;
}
