//! M-way merging of run groups with key-range partitioning.
//!
//! A group is a list of adjacent sorted runs that merge into one output run
//! occupying the same positions in the destination buffer. To keep every
//! worker busy even when there is only one group, a group is cut into key
//! ranges by sampled splitters: the tuples of each run falling in a range
//! form a contiguous piece, and all pieces of one range merge into a
//! contiguous slice of the output. Ranges are disjoint and ordered, so the
//! concatenation of the range outputs is the merged group.

use std::mem;

use tiersort_core::budget::MemoryBudget;
use tiersort_core::error::{Error, Result};
use tiersort_core::stage::Stage;
use tiersort_core::tuple::{SortKey, Tuple};
use tiersort_mem::guard::BudgetGuardImpl;
use tiersort_sched::fail_point;

use super::tournament::LoserTree;
use crate::traits::{reserve_scratch, StageContext};

/// Below this many tuples a group is merged by one task.
pub const MIN_PARTITION_TUPLES: usize = 4096;

/// Samples taken per run for each partition when choosing splitters.
const OVERSAMPLE: usize = 8;

/// Split `buf` into consecutive pieces of the given lengths.
pub(crate) fn split_by_lens<'a, T>(
    mut rest: &'a mut [T],
    lens: impl IntoIterator<Item = usize>,
) -> Vec<&'a mut [T]> {
    let mut out = Vec::new();
    for len in lens {
        let (head, tail) = mem::take(&mut rest).split_at_mut(len);
        out.push(head);
        rest = tail;
    }
    out
}

/// Merge the sorted `inputs` into `out`, whose length must equal their total.
/// The cursor arena is charged to `budget` for the duration of the merge.
pub fn merge_into<B>(inputs: Vec<&mut [Tuple]>, out: &mut [Tuple], budget: &B) -> Result<()>
where
    B: MemoryBudget<Guard = BudgetGuardImpl> + ?Sized,
{
    let total: usize = inputs.iter().map(|r| r.len()).sum();
    if total != out.len() {
        return Err(Error::Invariant(format!(
            "merge output holds {} slots for {total} input tuples",
            out.len()
        )));
    }
    if inputs.len() == 1 {
        // a lone run just moves across
        if let Some(only) = inputs.into_iter().next() {
            out.swap_with_slice(only);
        }
        return Ok(());
    }

    let arena = LoserTree::arena_bytes(inputs.len());
    let _guard = reserve_scratch(budget, Stage::ExternalMerge, arena, "l3-cursors")?;

    let mut tree = LoserTree::new(inputs);
    for slot in out.iter_mut() {
        *slot = tree
            .pop()
            .ok_or_else(|| Error::Invariant("merge inputs drained early".into()))?;
    }
    debug_assert!(tree.is_exhausted());
    Ok(())
}

/// Pick `parts - 1` ascending splitters from evenly spaced samples of `runs`.
fn choose_splitters(runs: &[&mut [Tuple]], parts: usize) -> Vec<SortKey> {
    let per_run = parts * OVERSAMPLE;
    let mut sample: Vec<SortKey> = runs
        .iter()
        .filter(|r| !r.is_empty())
        .flat_map(|r| {
            let step = (r.len() / per_run).max(1);
            r.iter().step_by(step).map(Tuple::sort_key)
        })
        .collect();
    sample.sort_unstable();
    if sample.is_empty() {
        return Vec::new();
    }
    (1..parts)
        .map(|p| sample[p * sample.len() / parts])
        .collect()
}

/// One unit of merge work: the pieces of every input run that fall in one
/// key range, and the output slice they fill.
pub(crate) struct MergeTask<'a> {
    pub inputs: Vec<&'a mut [Tuple]>,
    pub out: &'a mut [Tuple],
}

/// Cut one group into `parts` key-range tasks.
fn partition_group<'a>(
    runs: Vec<&'a mut [Tuple]>,
    out: &'a mut [Tuple],
    parts: usize,
) -> Vec<MergeTask<'a>> {
    if parts <= 1 || runs.len() <= 1 {
        return vec![MergeTask { inputs: runs, out }];
    }
    let splitters = choose_splitters(&runs, parts);
    let parts = splitters.len() + 1;

    // pieces[p] collects range p's slice of every run
    let mut pieces: Vec<Vec<&'a mut [Tuple]>> = (0..parts).map(|_| Vec::new()).collect();
    for run in runs {
        let mut cuts = Vec::with_capacity(parts);
        let mut prev = 0;
        for s in &splitters {
            let at = run.partition_point(|t| t.sort_key() < *s).max(prev);
            cuts.push(at - prev);
            prev = at;
        }
        cuts.push(run.len() - prev);
        for (p, piece) in split_by_lens(run, cuts).into_iter().enumerate() {
            pieces[p].push(piece);
        }
    }

    let out_lens: Vec<usize> = pieces
        .iter()
        .map(|ps| ps.iter().map(|r| r.len()).sum())
        .collect();
    pieces
        .into_iter()
        .zip(split_by_lens(out, out_lens))
        .map(|(inputs, out)| MergeTask { inputs, out })
        .collect()
}

/// Merge every group of `src` into the same positions of `dst`.
///
/// `groups[g]` lists the run lengths of group `g`; groups are laid out back
/// to back from position 0 and must cover `src`. Returns the number of merge
/// tasks executed.
pub fn merge_groups(
    ctx: &StageContext<'_>,
    src: &mut [Tuple],
    dst: &mut [Tuple],
    groups: &[Vec<usize>],
) -> Result<usize> {
    let group_lens: Vec<usize> = groups.iter().map(|g| g.iter().sum()).collect();
    if group_lens.iter().sum::<usize>() != src.len() || src.len() != dst.len() {
        return Err(Error::Invariant(
            "merge groups do not cover the relation buffer".into(),
        ));
    }

    let threads = ctx.pool.threads();
    let per_group = (threads / groups.len().max(1)).max(1);

    let mut tasks = Vec::new();
    for ((lens, src_group), dst_group) in groups
        .iter()
        .zip(split_by_lens(src, group_lens.iter().copied()))
        .zip(split_by_lens(dst, group_lens.iter().copied()))
    {
        let parts = per_group.min(src_group.len() / MIN_PARTITION_TUPLES).max(1);
        let runs = split_by_lens(src_group, lens.iter().copied());
        tasks.extend(partition_group(runs, dst_group, parts));
    }

    ctx.pool.run_stage(Stage::ExternalMerge, tasks, |task| {
        fail_point!(Stage::ExternalMerge, "l3-merge");
        merge_into(task.inputs, task.out, ctx.budget)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tiersort_core::id::TupleId;
    use tiersort_core::tuple::is_sorted;
    use tiersort_mem::guard::MemoryBudgetImpl;
    use tiersort_sched::pool::WorkerPool;

    /// `runs` sorted runs of `len` tuples laid out back to back.
    fn runs_buffer(rng: &mut StdRng, runs: usize, len: usize, key_range: i64) -> Vec<Tuple> {
        let mut buf = Vec::with_capacity(runs * len);
        for r in 0..runs {
            let mut run: Vec<Tuple> = (0..len)
                .map(|i| {
                    Tuple::new(
                        rng.gen_range(0..key_range),
                        TupleId::from_position(r * len + i),
                        "",
                    )
                })
                .collect();
            run.sort_by_key(Tuple::sort_key);
            buf.extend(run);
        }
        buf
    }

    #[test]
    fn split_by_lens_tiles() {
        let mut v: Vec<u8> = (0..10).collect();
        let parts = split_by_lens(&mut v, [3, 0, 7]);
        let lens: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        assert_eq!(lens, vec![3, 0, 7]);
        assert_eq!(parts[2][0], 3);
    }

    #[test]
    fn merge_into_rejects_mismatched_output() {
        let budget = MemoryBudgetImpl::unbounded();
        let mut a = vec![Tuple::new(1, TupleId::new(0), "")];
        let mut out = vec![Tuple::default(); 2];
        let err = merge_into(vec![&mut a[..]], &mut out, &budget).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn cursor_arena_is_charged_to_budget() {
        let budget = MemoryBudgetImpl::new(LoserTree::arena_bytes(2) - 1);
        let mut a = vec![Tuple::new(1, TupleId::new(0), "")];
        let mut b = vec![Tuple::new(0, TupleId::new(1), "")];
        let mut out = vec![Tuple::default(); 2];
        let err = merge_into(vec![&mut a[..], &mut b[..]], &mut out, &budget).unwrap_err();
        assert_eq!(err.kind(), tiersort_core::ErrorKind::TaskFailure);
    }

    #[test]
    fn partitioned_single_group_matches_full_sort() {
        let pool = WorkerPool::new(4).unwrap();
        let budget = MemoryBudgetImpl::unbounded();
        let ctx = StageContext::new(&pool, &budget);
        let mut rng = StdRng::seed_from_u64(42);

        let mut src = runs_buffer(&mut rng, 6, 5000, 1000);
        let mut expected = src.clone();
        expected.sort_by_key(Tuple::sort_key);
        let mut dst = vec![Tuple::default(); src.len()];

        let tasks = merge_groups(&ctx, &mut src, &mut dst, &[vec![5000; 6]]).unwrap();
        assert!(tasks > 1, "expected the group to be partitioned");
        assert_eq!(dst, expected);
    }

    #[test]
    fn heavy_duplicates_still_partition_correctly() {
        let pool = WorkerPool::new(8).unwrap();
        let budget = MemoryBudgetImpl::unbounded();
        let ctx = StageContext::new(&pool, &budget);
        let mut rng = StdRng::seed_from_u64(7);

        let mut src = runs_buffer(&mut rng, 3, 9000, 3);
        let mut dst = vec![Tuple::default(); src.len()];
        merge_groups(&ctx, &mut src, &mut dst, &[vec![9000; 3]]).unwrap();
        assert!(is_sorted(&dst));
        assert_eq!(dst.len(), 27000);
    }

    #[test]
    fn groups_merge_independently() {
        let pool = WorkerPool::new(2).unwrap();
        let budget = MemoryBudgetImpl::unbounded();
        let ctx = StageContext::new(&pool, &budget);
        let mut rng = StdRng::seed_from_u64(3);

        let mut src = runs_buffer(&mut rng, 5, 16, 100);
        let mut dst = vec![Tuple::default(); src.len()];
        merge_groups(&ctx, &mut src, &mut dst, &[vec![16, 16], vec![16, 16], vec![16]]).unwrap();
        assert!(is_sorted(&dst[0..32]));
        assert!(is_sorted(&dst[32..64]));
        assert!(is_sorted(&dst[64..80]));
    }

    #[test]
    fn uncovered_buffer_is_rejected() {
        let pool = WorkerPool::new(1).unwrap();
        let budget = MemoryBudgetImpl::unbounded();
        let ctx = StageContext::new(&pool, &budget);
        let mut src = vec![Tuple::default(); 10];
        let mut dst = vec![Tuple::default(); 10];
        assert!(merge_groups(&ctx, &mut src, &mut dst, &[vec![4, 4]]).is_err());
    }
}
