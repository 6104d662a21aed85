//! M-pass: repeated grouped merges until one run remains.
//!
//! Each pass groups `M` consecutive runs, merges every group into one run in
//! the other buffer, and swaps the buffers. `R` runs need `ceil(log_M R)`
//! passes; a pass starts only after the previous one finished.

use std::mem;

use tiersort_core::error::Result;
use tiersort_core::run::{RunMeta, Tier};
use tiersort_core::tuple::Tuple;

use super::mway::merge_groups;
use crate::traits::StageContext;

/// Outcome of a multi-pass merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub passes: u32,
    pub tasks: usize,
    pub runs: Vec<RunMeta>,
}

/// Run-length groups for one pass over `runs`.
fn group_runs(runs: &[RunMeta], fan_in: usize) -> Vec<Vec<usize>> {
    runs.chunks(fan_in)
        .map(|g| g.iter().map(|r| r.len).collect())
        .collect()
}

/// Layout after merging each group into one run.
fn merged_layout(runs: &[RunMeta], fan_in: usize, level: u32) -> Vec<RunMeta> {
    runs.chunks(fan_in)
        .map(|g| RunMeta {
            start: g[0].start,
            len: g.iter().map(|r| r.len).sum(),
            level,
            tier: Tier::External,
        })
        .collect()
}

/// Merge `runs` of `buf` down to a single run, `fan_in` at a time.
///
/// `spare` must be as long as `buf`; on return `buf` holds the result and
/// `spare` holds no meaningful data. At least one pass is made whenever
/// there are two or more runs, even if they all fit one group.
pub fn merge_passes(
    ctx: &StageContext<'_>,
    buf: &mut Vec<Tuple>,
    spare: &mut Vec<Tuple>,
    mut runs: Vec<RunMeta>,
    fan_in: usize,
) -> Result<PassSummary> {
    let mut passes = 0;
    let mut tasks = 0;
    let base_level = runs.iter().map(|r| r.level).max().unwrap_or(0);

    while runs.len() > 1 {
        let groups = group_runs(&runs, fan_in);
        tasks += merge_groups(ctx, buf, spare, &groups)?;
        passes += 1;
        runs = merged_layout(&runs, fan_in, base_level + passes);
        mem::swap(buf, spare);

        if cfg!(debug_assertions) {
            tiersort_sched::verify::assert_runs_sorted(buf, &runs);
        }
    }

    Ok(PassSummary {
        passes,
        tasks,
        runs,
    })
}
