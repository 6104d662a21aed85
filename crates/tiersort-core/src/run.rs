//! Run descriptors and the logical/padded length pair.
//!
//! A run is a contiguous, sorted range of the relation buffer. Metadata is
//! written once by the stage that produced the runs and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which level of the memory hierarchy produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Register,
    Cache,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    pub start: usize,
    pub len: usize,
    /// Merge generation: 0 for L1 blocks, +1 per L2 round or L3 pass.
    pub level: u32,
    pub tier: Tier,
}

impl RunMeta {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Cut `total` tuples into consecutive runs of `run_len` (the last may be short).
pub fn layout_runs(total: usize, run_len: usize, level: u32, tier: Tier) -> Vec<RunMeta> {
    let run_len = run_len.max(1);
    (0..total)
        .step_by(run_len)
        .map(|start| RunMeta {
            start,
            len: run_len.min(total - start),
            level,
            tier,
        })
        .collect()
}

/// Logical vs padded length of a block or run that a power-of-two network
/// operates on. Slots in `logical_len..padded_len` hold sentinels and are
/// stripped at the boundary where the padded shape is last needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub logical_len: usize,
    pub padded_len: usize,
}

impl Padding {
    /// Pad `logical_len` up to the next power of two.
    pub fn to_pow2(logical_len: usize) -> Self {
        Self {
            logical_len,
            padded_len: logical_len.next_power_of_two(),
        }
    }

    /// Pad `logical_len` up to a fixed width (L1 block size).
    pub fn to_width(logical_len: usize, width: usize) -> Self {
        debug_assert!(logical_len <= width);
        Self {
            logical_len,
            padded_len: width,
        }
    }

    pub fn sentinels(&self) -> usize {
        self.padded_len - self.logical_len
    }

    pub fn is_padded(&self) -> bool {
        self.padded_len != self.logical_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_covers_relation_without_overlap() {
        let runs = layout_runs(21, 8, 0, Tier::Register);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[2], RunMeta { start: 16, len: 5, level: 0, tier: Tier::Register });
        let covered: usize = runs.iter().map(|r| r.len).sum();
        assert_eq!(covered, 21);
        assert!(runs.windows(2).all(|w| w[0].end() == w[1].start));
    }

    #[test]
    fn empty_relation_has_no_runs() {
        assert!(layout_runs(0, 8, 0, Tier::Register).is_empty());
    }

    #[test]
    fn padding_pairs() {
        let p = Padding::to_pow2(5);
        assert_eq!(p.padded_len, 8);
        assert_eq!(p.sentinels(), 3);
        assert!(!Padding::to_pow2(8).is_padded());
        assert_eq!(Padding::to_width(3, 16).sentinels(), 13);
    }
}
