//! L3: external merge of cache-sized runs into the sorted relation.
//!
//! `mway` merges groups of runs (partitioned across workers), `mpass`
//! repeats that over `ceil(log_M R)` passes, and `tournament` is the loser
//! tree both are built on.

pub mod mpass;
pub mod mway;
pub mod tournament;

use std::iter;

use tiersort_core::error::Result;
use tiersort_core::run::{RunMeta, Tier};
use tiersort_core::stage::Stage;
use tiersort_core::tuple::Tuple;
use tiersort_sched::plan::{ResolvedStrategy, SortPlan};

use crate::plan::Footprint;
use crate::traits::{SortStage, StageContext};

pub use mpass::{merge_passes, PassSummary};
pub use mway::{merge_groups, merge_into};
pub use tournament::LoserTree;

/// L3 stage for one resolved strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExternalMergeStage {
    strategy: ResolvedStrategy,
    fan_in: usize,
}

impl ExternalMergeStage {
    pub fn new(strategy: ResolvedStrategy, fan_in: usize) -> Self {
        Self { strategy, fan_in }
    }

    pub fn from_plan(plan: &SortPlan) -> Self {
        Self::new(plan.strategy, plan.fan_in)
    }

    pub fn strategy(&self) -> ResolvedStrategy {
        self.strategy
    }
}

impl SortStage for ExternalMergeStage {
    fn stage(&self) -> Stage {
        Stage::ExternalMerge
    }

    fn memory_need(&self, plan: &SortPlan) -> Footprint {
        let k = match self.strategy {
            ResolvedStrategy::AlreadySorted => return Footprint::none(),
            ResolvedStrategy::MWay => plan.runs,
            ResolvedStrategy::MPass => plan.runs.min(self.fan_in),
        };
        Footprint {
            per_task_bytes: LoserTree::arena_bytes(k),
            concurrent_tasks: plan.runs.div_ceil(k).max(1),
        }
    }

    fn execute(
        &self,
        ctx: &StageContext<'_>,
        buf: &mut Vec<Tuple>,
        runs: Vec<RunMeta>,
    ) -> Result<Vec<RunMeta>> {
        if self.strategy == ResolvedStrategy::AlreadySorted || runs.len() <= 1 {
            return Ok(runs
                .into_iter()
                .map(|r| RunMeta {
                    tier: Tier::External,
                    ..r
                })
                .collect());
        }

        let mut spare: Vec<Tuple> = iter::repeat_with(Tuple::default).take(buf.len()).collect();
        let fan_in = match self.strategy {
            // one group holding every run
            ResolvedStrategy::MWay => runs.len(),
            _ => self.fan_in,
        };
        let summary = merge_passes(ctx, buf, &mut spare, runs, fan_in)?;
        Ok(summary.runs)
    }
}
