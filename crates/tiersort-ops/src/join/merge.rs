//! Equi-join of two key-sorted relations by a single forward scan.
//!
//! Both inputs are walked once. When the current keys match, the full group
//! of equal keys on each side is found and every left tuple of the group is
//! paired with every right tuple of the group, left-major. Each output pair
//! is produced exactly once, so the output cardinality is the sum over keys
//! of `|left group| * |right group|`.
//!
//! The parallel stage cuts the left side only at key-group boundaries and
//! finds the matching right-side cut by binary search, so no group is ever
//! split between two tasks and the concatenated task outputs equal the
//! sequential result.

use std::cmp::Ordering;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use tiersort_core::error::Result;
use tiersort_core::stage::Stage;
use tiersort_core::tuple::{Key, Tuple};
use tiersort_sched::fail_point;

use crate::traits::StageContext;

/// Left tuples per join task, at minimum.
pub const MIN_JOIN_PARTITION: usize = 2048;

/// One output row: a left and a right tuple with equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedTuple {
    pub left: Tuple,
    pub right: Tuple,
}

impl JoinedTuple {
    pub fn key(&self) -> Key {
        self.left.key
    }
}

fn sorted_by_key(ts: &[Tuple]) -> bool {
    ts.windows(2).all(|w| w[0].key <= w[1].key)
}

/// End of the run of tuples sharing `ts[start].key`.
#[inline]
fn group_end(ts: &[Tuple], start: usize) -> usize {
    let key = ts[start].key;
    let mut end = start + 1;
    while end < ts.len() && ts[end].key == key {
        end += 1;
    }
    end
}

#[derive(Debug, Clone)]
struct Group {
    left: Range<usize>,
    right: Range<usize>,
    li: usize,
    rj: usize,
}

/// Lazy merge join. Yields pairs in key order; within a key, left-major.
#[derive(Debug, Clone)]
pub struct MergeJoinIter<'a> {
    left: &'a [Tuple],
    right: &'a [Tuple],
    i: usize,
    j: usize,
    group: Option<Group>,
}

impl<'a> MergeJoinIter<'a> {
    pub fn new(left: &'a [Tuple], right: &'a [Tuple]) -> Self {
        debug_assert!(sorted_by_key(left), "left join input is not sorted by key");
        debug_assert!(sorted_by_key(right), "right join input is not sorted by key");
        Self {
            left,
            right,
            i: 0,
            j: 0,
            group: None,
        }
    }

    /// Advance to the next pair of matching key groups.
    fn next_group(&mut self) -> Option<Group> {
        while self.i < self.left.len() && self.j < self.right.len() {
            match self.left[self.i].key.cmp(&self.right[self.j].key) {
                Ordering::Less => self.i += 1,
                Ordering::Greater => self.j += 1,
                Ordering::Equal => {
                    let le = group_end(self.left, self.i);
                    let re = group_end(self.right, self.j);
                    let g = Group {
                        left: self.i..le,
                        right: self.j..re,
                        li: self.i,
                        rj: self.j,
                    };
                    self.i = le;
                    self.j = re;
                    return Some(g);
                }
            }
        }
        None
    }
}

impl Iterator for MergeJoinIter<'_> {
    type Item = JoinedTuple;

    fn next(&mut self) -> Option<JoinedTuple> {
        loop {
            if let Some(g) = self.group.as_mut() {
                if g.li < g.left.end {
                    let out = JoinedTuple {
                        left: self.left[g.li].clone(),
                        right: self.right[g.rj].clone(),
                    };
                    g.rj += 1;
                    if g.rj == g.right.end {
                        g.rj = g.right.start;
                        g.li += 1;
                    }
                    return Some(out);
                }
            }
            self.group = Some(self.next_group()?);
        }
    }
}

/// Materialized merge join of two key-sorted relations.
pub fn merge_join(left: &[Tuple], right: &[Tuple]) -> Vec<JoinedTuple> {
    MergeJoinIter::new(left, right).collect()
}

/// Output cardinality of the join, without building it.
pub fn count_matches(left: &[Tuple], right: &[Tuple]) -> u64 {
    let mut it = MergeJoinIter::new(left, right);
    let mut total = 0u64;
    while let Some(g) = it.next_group() {
        total += (g.left.len() as u64) * (g.right.len() as u64);
    }
    total
}

/// Left-side cut points at key-group boundaries, including 0 and `len`.
fn left_cuts(left: &[Tuple], parts: usize) -> Vec<usize> {
    let mut cuts = vec![0];
    for p in 1..parts {
        let key = left[p * left.len() / parts].key;
        let cut = left.partition_point(|t| t.key < key);
        if cut > cuts[cuts.len() - 1] {
            cuts.push(cut);
        }
    }
    cuts.push(left.len());
    cuts
}

/// Parallel merge join stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeJoinStage;

impl MergeJoinStage {
    pub fn stage(&self) -> Stage {
        Stage::MergeJoin
    }

    pub fn execute(
        &self,
        ctx: &StageContext<'_>,
        left: &[Tuple],
        right: &[Tuple],
    ) -> Result<Vec<JoinedTuple>> {
        let parts = ctx
            .pool
            .threads()
            .min(left.len() / MIN_JOIN_PARTITION)
            .max(1);
        let lcuts = left_cuts(left, parts);

        let mut rcuts = vec![0];
        for &c in &lcuts[1..lcuts.len() - 1] {
            let key = left[c].key;
            rcuts.push(right.partition_point(|t| t.key < key));
        }
        rcuts.push(right.len());

        let mut outputs: Vec<Vec<JoinedTuple>> = (1..lcuts.len()).map(|_| Vec::new()).collect();
        let tasks: Vec<(&[Tuple], &[Tuple], &mut Vec<JoinedTuple>)> = lcuts
            .windows(2)
            .zip(rcuts.windows(2))
            .zip(outputs.iter_mut())
            .map(|((l, r), out)| (&left[l[0]..l[1]], &right[r[0]..r[1]], out))
            .collect();

        ctx.pool.run_stage(Stage::MergeJoin, tasks, |(l, r, out)| {
            fail_point!(Stage::MergeJoin, "join-partition");
            out.extend(MergeJoinIter::new(l, r));
            Ok(())
        })?;

        Ok(outputs.into_iter().flatten().collect())
    }
}
