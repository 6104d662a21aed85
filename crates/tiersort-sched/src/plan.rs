//! Per-relation sort plan.
//!
//! Inputs:
//! - A validated `SortConfig` (N, C, M, strategy).
//! - The relation's cardinality.
//!
//! Output:
//! - How many L1 blocks, how many L2 doubling rounds, the run count `R` handed
//!   to L3, and which L3 strategy runs with how many passes.

use serde::{Deserialize, Serialize};
use std::fmt;

use tiersort_core::config::{MergeStrategy, SortConfig};
use tiersort_core::error::{Error, Result};

/// L3 strategy after applying the selection policy to a concrete `R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedStrategy {
    /// Zero or one run: L2 output is already the sorted relation.
    AlreadySorted,
    /// One M-way merge over all `R <= M` runs.
    MWay,
    /// `ceil(log_M R)` sequential passes of grouped M-way merges.
    MPass,
}

impl fmt::Display for ResolvedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolvedStrategy::AlreadySorted => "already-sorted",
            ResolvedStrategy::MWay => "m-way",
            ResolvedStrategy::MPass => "m-pass",
        })
    }
}

/// Number of M-way passes needed to reduce `runs` to one: `ceil(log_M R)`.
pub fn passes_needed(runs: usize, fan_in: usize) -> u32 {
    debug_assert!(fan_in >= 2);
    let mut remaining = runs;
    let mut passes = 0;
    while remaining > 1 {
        remaining = remaining.div_ceil(fan_in);
        passes += 1;
    }
    passes
}

/// Apply the selection policy: M-way whenever `R <= M`, M-pass otherwise.
///
/// Forcing `m-way` on more runs than the fan-in admits is infeasible and
/// reported as a configuration error; forcing `m-pass` on `R <= M` runs is
/// honored and takes a single pass.
pub fn resolve_strategy(
    requested: MergeStrategy,
    runs: usize,
    fan_in: usize,
) -> Result<ResolvedStrategy> {
    if runs <= 1 {
        return Ok(ResolvedStrategy::AlreadySorted);
    }
    match requested {
        MergeStrategy::Auto if runs <= fan_in => Ok(ResolvedStrategy::MWay),
        MergeStrategy::Auto | MergeStrategy::MPass => Ok(ResolvedStrategy::MPass),
        MergeStrategy::MWay if runs <= fan_in => Ok(ResolvedStrategy::MWay),
        MergeStrategy::MWay => Err(Error::config(format!(
            "m-way merge of {runs} runs exceeds merge fan-in {fan_in}; use m-pass or auto"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPlan {
    pub tuples: usize,
    pub block_size: usize,
    pub l1_blocks: usize,
    /// Doubling rounds L2 performs (each merges run pairs).
    pub l2_rounds: u32,
    /// Run length after L2 (the final run may be shorter).
    pub l2_run_len: usize,
    /// `R`: runs handed to L3.
    pub runs: usize,
    /// `M`.
    pub fan_in: usize,
    pub strategy: ResolvedStrategy,
    pub passes: u32,
}

impl SortPlan {
    pub fn new(config: &SortConfig, tuples: usize) -> Result<Self> {
        config.validate()?;
        let n = config.register_block_size;
        let c = config.cache_run_size;
        let fan_in = config.fan_in();

        let mut run_len = n;
        let mut l2_rounds = 0;
        while run_len < c && run_len < tuples {
            run_len *= 2;
            l2_rounds += 1;
        }

        let runs = tuples.div_ceil(run_len);
        let strategy = resolve_strategy(config.merge_strategy, runs, fan_in)?;
        let passes = match strategy {
            ResolvedStrategy::AlreadySorted => 0,
            ResolvedStrategy::MWay => 1,
            ResolvedStrategy::MPass => passes_needed(runs, fan_in),
        };

        Ok(Self {
            tuples,
            block_size: n,
            l1_blocks: tuples.div_ceil(n),
            l2_rounds,
            l2_run_len: run_len,
            runs,
            fan_in,
            strategy,
            passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(n: usize, c: usize, m: usize) -> SortConfig {
        SortConfig {
            register_block_size: n,
            cache_run_size: c,
            merge_fan_in: Some(m),
            thread_count: 2,
            ..SortConfig::default()
        }
    }

    #[test]
    fn pass_counts() {
        assert_eq!(passes_needed(0, 4), 0);
        assert_eq!(passes_needed(1, 4), 0);
        assert_eq!(passes_needed(4, 4), 1);
        assert_eq!(passes_needed(5, 4), 2);
        assert_eq!(passes_needed(16, 4), 2);
        assert_eq!(passes_needed(17, 4), 3);
        assert_eq!(passes_needed(9, 2), 4);
    }

    #[test]
    fn fan_in_plus_one_takes_two_passes() {
        let plan = SortPlan::new(&cfg(8, 16, 4), 16 * 5).unwrap();
        assert_eq!(plan.runs, 5);
        assert_eq!(plan.strategy, ResolvedStrategy::MPass);
        assert_eq!(plan.passes, 2);
    }

    #[test]
    fn boundary_relation_of_21_tuples() {
        let plan = SortPlan::new(&cfg(8, 64, 4), 21).unwrap();
        assert_eq!(plan.l1_blocks, 3);
        assert_eq!(plan.l2_rounds, 2);
        assert_eq!(plan.l2_run_len, 32);
        assert_eq!(plan.runs, 1);
        assert_eq!(plan.strategy, ResolvedStrategy::AlreadySorted);
    }

    #[test]
    fn auto_prefers_single_pass() {
        let plan = SortPlan::new(&cfg(8, 16, 4), 16 * 4).unwrap();
        assert_eq!(plan.strategy, ResolvedStrategy::MWay);
        assert_eq!(plan.passes, 1);
    }

    #[test]
    fn forced_mway_over_fan_in_is_rejected() {
        let config = cfg(8, 16, 4).with_strategy(MergeStrategy::MWay);
        let err = SortPlan::new(&config, 16 * 9).unwrap_err();
        assert_eq!(err.kind(), tiersort_core::ErrorKind::Configuration);
    }

    #[test]
    fn forced_mpass_within_fan_in_is_one_pass() {
        let config = cfg(8, 16, 4).with_strategy(MergeStrategy::MPass);
        let plan = SortPlan::new(&config, 16 * 3).unwrap();
        assert_eq!(plan.strategy, ResolvedStrategy::MPass);
        assert_eq!(plan.passes, 1);
    }

    #[test]
    fn empty_relation_plan() {
        let plan = SortPlan::new(&cfg(8, 16, 4), 0).unwrap();
        assert_eq!(plan.runs, 0);
        assert_eq!(plan.l2_rounds, 0);
        assert_eq!(plan.passes, 0);
    }
}
