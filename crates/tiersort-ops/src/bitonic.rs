//! L2: doubling bitonic merges from register blocks up to cache runs.
//!
//! Each round pairs adjacent runs of length `s` and merges every pair in its
//! own task; the next round starts only after all pairs are done. Pairs of
//! equal power-of-two length merge in place. A pair whose right run is short
//! (the tail of the relation) is padded to a power-of-two bitonic sequence in
//! budget-accounted scratch and stripped again when copied back.

use std::iter;
use std::mem;

use tiersort_core::budget::MemoryBudget;
use tiersort_core::error::Result;
use tiersort_core::run::{layout_runs, Padding, RunMeta, Tier};
use tiersort_core::stage::Stage;
use tiersort_core::tuple::Tuple;
use tiersort_mem::guard::BudgetGuardImpl;
use tiersort_mem::pool::{tuple_slots_bytes, TupleBuf};
use tiersort_sched::fail_point;
use tiersort_sched::plan::SortPlan;

use crate::network::compare_exchange;
use crate::plan::Footprint;
use crate::traits::{SortStage, StageContext};

/// Half-cleaner cascade over a bitonic `buf` of length `2 * half`.
fn half_cleaners(buf: &mut [Tuple], mut half: usize) {
    debug_assert_eq!(buf.len(), 2 * half);
    while half >= 1 {
        for i in 0..buf.len() {
            if i & half == 0 {
                compare_exchange(buf, i, i + half);
            }
        }
        half /= 2;
    }
}

/// Merge `region[..split]` and `region[split..]`, both sorted, in place.
///
/// Scratch is only taken (and charged to `budget`) when the two runs are not
/// the same power-of-two length.
pub fn merge_adjacent<B>(region: &mut [Tuple], split: usize, budget: &B) -> Result<()>
where
    B: MemoryBudget<Guard = BudgetGuardImpl> + ?Sized,
{
    let a = split;
    let b = region.len() - split;
    if a == 0 || b == 0 {
        return Ok(());
    }

    if a == b && a.is_power_of_two() {
        region[a..].reverse();
        half_cleaners(region, a);
        return Ok(());
    }

    let half = Padding::to_pow2(a.max(b)).padded_len;
    let pad = Padding {
        logical_len: a + b,
        padded_len: 2 * half,
    };
    let mut scratch = TupleBuf::with_capacity(budget, pad.padded_len, "l2-padding")
        .map_err(|e| e.into_task_failure(Stage::BitonicMerge))?;

    // ascending left run, sentinels, then the right run mirrored so the
    // whole buffer rises and then falls
    let (left, right) = region.split_at_mut(a);
    scratch.extend(left.iter_mut().map(mem::take));
    scratch.extend(iter::repeat_with(Tuple::sentinel).take(half - a));
    scratch.extend(iter::repeat_with(Tuple::sentinel).take(half - b));
    scratch.extend(right.iter_mut().rev().map(mem::take));

    half_cleaners(&mut scratch, half);
    debug_assert!(scratch[pad.logical_len..].iter().all(Tuple::is_sentinel));

    for (slot, t) in region.iter_mut().zip(scratch.drain(..pad.logical_len)) {
        *slot = t;
    }
    Ok(())
}

/// L2 stage. Starts from sorted runs of `block_size` and doubles `rounds`
/// times.
#[derive(Debug, Clone, Copy)]
pub struct BitonicMergeStage {
    block_size: usize,
    rounds: u32,
}

impl BitonicMergeStage {
    pub fn new(block_size: usize, rounds: u32) -> Self {
        Self { block_size, rounds }
    }

    pub fn from_plan(plan: &SortPlan) -> Self {
        Self::new(plan.block_size, plan.l2_rounds)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Run length after all rounds.
    pub fn output_run_len(&self) -> usize {
        self.block_size << self.rounds
    }
}

impl SortStage for BitonicMergeStage {
    fn stage(&self) -> Stage {
        Stage::BitonicMerge
    }

    fn memory_need(&self, plan: &SortPlan) -> Footprint {
        if self.rounds == 0 || plan.tuples % plan.l2_run_len == 0 {
            return Footprint::none();
        }
        // only the pair holding the tail of the relation pads; its scratch
        // is at most twice the largest run it merges
        Footprint {
            per_task_bytes: tuple_slots_bytes(self.output_run_len()),
            concurrent_tasks: 1,
        }
    }

    fn execute(
        &self,
        ctx: &StageContext<'_>,
        buf: &mut Vec<Tuple>,
        runs: Vec<RunMeta>,
    ) -> Result<Vec<RunMeta>> {
        debug_assert!(runs.iter().all(|r| r.len <= self.block_size));

        let mut run_len = self.block_size;
        for round in 1..=self.rounds {
            let tasks: Vec<&mut [Tuple]> = buf.chunks_mut(2 * run_len).collect();
            ctx.pool.run_stage(Stage::BitonicMerge, tasks, |region| {
                fail_point!(Stage::BitonicMerge, "l2-merge");
                if region.len() <= run_len {
                    return Ok(());
                }
                merge_adjacent(region, run_len, ctx.budget)
            })?;
            run_len *= 2;

            if cfg!(debug_assertions) {
                tiersort_sched::verify::assert_runs_sorted(
                    buf,
                    &layout_runs(buf.len(), run_len, round, Tier::Cache),
                );
            }
        }

        Ok(layout_runs(buf.len(), run_len, self.rounds, Tier::Cache))
    }
}
