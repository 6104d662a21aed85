//! L1: fixed-width sorting networks over register-sized blocks.
//!
//! Every supported width gets its comparator table generated once, when the
//! table is built. A table is a flat list of `(i, j)` compare-exchange pairs
//! with `i < j`; applying them in order leaves the minimum at `i`. The pairs
//! come from the bitonic construction (a reversing "flip" comparator layer
//! followed by half-cleaners), which sorts any input of the table's width.

use std::iter;
use std::mem;

use tiersort_core::config::SUPPORTED_BLOCK_SIZES;
use tiersort_core::error::{Error, Result};
use tiersort_core::run::{layout_runs, Padding, RunMeta, Tier};
use tiersort_core::stage::Stage;
use tiersort_core::tuple::Tuple;
use tiersort_sched::fail_point;
use tiersort_sched::plan::SortPlan;

use crate::plan::Footprint;
use crate::traits::{SortStage, StageContext};

/// Swap `buf[i]` and `buf[j]` if they are out of order. Requires `i < j`.
#[inline(always)]
pub(crate) fn compare_exchange(buf: &mut [Tuple], i: usize, j: usize) {
    if buf[j].precedes(&buf[i]) {
        buf.swap(i, j);
    }
}

/// Comparator table for one block width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortingNetwork {
    width: usize,
    comparators: Vec<(u8, u8)>,
    depth: usize,
}

impl SortingNetwork {
    /// Build the network for `width`, which must be one of the supported
    /// block sizes.
    pub fn new(width: usize) -> Result<Self> {
        if !SUPPORTED_BLOCK_SIZES.contains(&width) {
            return Err(Error::config(format!(
                "no sorting network for block size {width} (supported: {SUPPORTED_BLOCK_SIZES:?})"
            )));
        }
        let (comparators, depth) = bitonic_pairs(width);
        Ok(Self {
            width,
            comparators,
            depth,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn comparators(&self) -> &[(u8, u8)] {
        &self.comparators
    }

    /// Number of parallel comparator layers.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Sort a block of exactly `width` tuples in place.
    pub fn sort_block(&self, block: &mut [Tuple]) {
        debug_assert_eq!(block.len(), self.width);
        for &(i, j) in &self.comparators {
            compare_exchange(block, i as usize, j as usize);
        }
    }

    /// Sort a block of at most `width` tuples. A short block is padded with
    /// sentinels to the full width, sorted, and the sentinels (which settle
    /// at the tail) are dropped again.
    pub fn sort_partial(&self, block: &mut [Tuple]) {
        let pad = Padding::to_width(block.len(), self.width);
        if !pad.is_padded() {
            self.sort_block(block);
            return;
        }
        let mut padded: Vec<Tuple> = block
            .iter_mut()
            .map(mem::take)
            .chain(iter::repeat_with(Tuple::sentinel).take(pad.sentinels()))
            .collect();
        self.sort_block(&mut padded);
        debug_assert!(padded[pad.logical_len..].iter().all(Tuple::is_sentinel));
        for (slot, t) in block.iter_mut().zip(padded) {
            *slot = t;
        }
    }
}

/// Pairs for a bitonic sorter of `width` (a power of two), in application
/// order, plus the layer count.
fn bitonic_pairs(width: usize) -> (Vec<(u8, u8)>, usize) {
    let mut pairs = Vec::new();
    let mut depth = 0;
    let mut p = 1;
    while p < width {
        // flip: mirror-image pairs inside each block of 2p
        for base in (0..width).step_by(2 * p) {
            for i in 0..p {
                pairs.push(((base + i) as u8, (base + 2 * p - 1 - i) as u8));
            }
        }
        depth += 1;
        let mut q = p / 2;
        while q >= 1 {
            for i in 0..width {
                if i & q == 0 {
                    pairs.push((i as u8, (i + q) as u8));
                }
            }
            depth += 1;
            q /= 2;
        }
        p *= 2;
    }
    (pairs, depth)
}

/// All supported networks, generated together at pipeline start.
#[derive(Debug, Clone)]
pub struct NetworkTable {
    networks: Vec<SortingNetwork>,
}

impl NetworkTable {
    pub fn generate() -> Self {
        let networks = SUPPORTED_BLOCK_SIZES
            .iter()
            .filter_map(|&w| SortingNetwork::new(w).ok())
            .collect();
        Self { networks }
    }

    pub fn get(&self, width: usize) -> Result<&SortingNetwork> {
        self.networks
            .iter()
            .find(|n| n.width == width)
            .ok_or_else(|| Error::config(format!("no sorting network for block size {width}")))
    }

    pub fn widths(&self) -> impl Iterator<Item = usize> + '_ {
        self.networks.iter().map(|n| n.width)
    }
}

/// L1 stage: one task per block, each sorted with the same network.
#[derive(Debug, Clone)]
pub struct RegisterSortStage {
    network: SortingNetwork,
}

impl RegisterSortStage {
    pub fn new(network: SortingNetwork) -> Self {
        Self { network }
    }

    pub fn block_size(&self) -> usize {
        self.network.width
    }
}

impl SortStage for RegisterSortStage {
    fn stage(&self) -> Stage {
        Stage::RegisterSort
    }

    fn memory_need(&self, _plan: &SortPlan) -> Footprint {
        // Padding a partial block stays within register scale.
        Footprint::none()
    }

    fn execute(
        &self,
        ctx: &StageContext<'_>,
        buf: &mut Vec<Tuple>,
        _runs: Vec<RunMeta>,
    ) -> Result<Vec<RunMeta>> {
        let width = self.network.width;
        let tasks: Vec<&mut [Tuple]> = buf.chunks_mut(width).collect();
        ctx.pool.run_stage(Stage::RegisterSort, tasks, |block| {
            fail_point!(Stage::RegisterSort, "l1-block");
            self.network.sort_partial(block);
            Ok(())
        })?;
        Ok(layout_runs(buf.len(), width, 0, Tier::Register))
    }
}
