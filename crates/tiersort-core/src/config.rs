//! Sort/join configuration that callers serialize/deserialize.
//!
//! Field names serialize in camelCase so a JSON document uses the option
//! names `registerBlockSize`, `cacheRunSize`, `mergeFanIn`, `threadCount`,
//! `mergeStrategy` and `memoryBudgetBytes`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::tuple::Tuple;

/// Block sizes for which a sorting network is generated.
pub const SUPPORTED_BLOCK_SIZES: [usize; 6] = [2, 4, 8, 16, 32, 64];

/// Fan-in used when neither `mergeFanIn` nor a memory budget is given.
pub const DEFAULT_FAN_IN: usize = 8;

/// How L3 merges the cache-sized runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStrategy {
    #[serde(rename = "m-way")]
    MWay,
    #[serde(rename = "m-pass")]
    MPass,
    /// Single-pass M-way when `R <= M`, M-pass otherwise.
    #[default]
    #[serde(rename = "auto")]
    Auto,
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m-way" | "mway" => Ok(MergeStrategy::MWay),
            "m-pass" | "mpass" => Ok(MergeStrategy::MPass),
            "auto" => Ok(MergeStrategy::Auto),
            other => Err(Error::config(format!("unknown merge strategy '{other}'"))),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergeStrategy::MWay => "m-way",
            MergeStrategy::MPass => "m-pass",
            MergeStrategy::Auto => "auto",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortConfig {
    /// L1 block size `N`. Must be one of [`SUPPORTED_BLOCK_SIZES`].
    pub register_block_size: usize,

    /// L2 output run length `C` in tuples. Power of two, at least `N`.
    pub cache_run_size: usize,

    /// L3 fan-in `M`. When unset it is derived from `memory_budget_bytes`.
    pub merge_fan_in: Option<usize>,

    /// Worker threads in the pipeline's pool. Reused by every stage.
    pub thread_count: usize,

    pub merge_strategy: MergeStrategy,

    /// Hard cap on transient stage buffers (bytes). `None` means unbounded.
    pub memory_budget_bytes: Option<usize>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            register_block_size: 16,
            cache_run_size: 4096,
            merge_fan_in: None,
            thread_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            merge_strategy: MergeStrategy::Auto,
            memory_budget_bytes: None,
        }
    }
}

impl SortConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TIERSORT_REGISTER_BLOCK_SIZE`: L1 block size
    /// - `TIERSORT_CACHE_RUN_SIZE`: L2 run length
    /// - `TIERSORT_MERGE_FAN_IN`: L3 fan-in
    /// - `TIERSORT_THREADS`: worker threads
    /// - `TIERSORT_MERGE_STRATEGY`: `m-way`, `m-pass` or `auto`
    /// - `TIERSORT_MEMORY_BUDGET_BYTES`: transient buffer cap
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_parse::<usize>("TIERSORT_REGISTER_BLOCK_SIZE") {
            cfg.register_block_size = v;
        }
        if let Some(v) = env_parse::<usize>("TIERSORT_CACHE_RUN_SIZE") {
            cfg.cache_run_size = v;
        }
        if let Some(v) = env_parse::<usize>("TIERSORT_MERGE_FAN_IN") {
            cfg.merge_fan_in = Some(v);
        }
        if let Some(v) = env_parse::<usize>("TIERSORT_THREADS") {
            cfg.thread_count = v;
        }
        if let Some(v) = env_parse::<MergeStrategy>("TIERSORT_MERGE_STRATEGY") {
            cfg.merge_strategy = v;
        }
        if let Some(v) = env_parse::<usize>("TIERSORT_MEMORY_BUDGET_BYTES") {
            cfg.memory_budget_bytes = Some(v);
        }

        cfg
    }

    /// Parse a JSON document; absent options keep their defaults.
    pub fn from_json(doc: &str) -> Result<Self> {
        Ok(serde_json::from_str(doc)?)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    pub fn with_fan_in(mut self, fan_in: usize) -> Self {
        self.merge_fan_in = Some(fan_in);
        self
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    /// Bytes of one cache-sized run buffer (tuple slots only; payloads are
    /// shared, not copied, when tuples move).
    pub fn run_buffer_bytes(&self) -> usize {
        self.cache_run_size
            .saturating_mul(std::mem::size_of::<Tuple>())
    }

    /// Resolve `M`: explicit fan-in, else budget / run buffer, else the default.
    pub fn fan_in(&self) -> usize {
        match (self.merge_fan_in, self.memory_budget_bytes) {
            (Some(m), _) => m,
            (None, Some(budget)) => budget / self.run_buffer_bytes().max(1),
            (None, None) => DEFAULT_FAN_IN,
        }
    }

    /// Reject infeasible parameters before any work starts.
    pub fn validate(&self) -> Result<()> {
        let n = self.register_block_size;
        if !SUPPORTED_BLOCK_SIZES.contains(&n) {
            return Err(Error::config(format!(
                "registerBlockSize {n} has no sorting network (supported: {SUPPORTED_BLOCK_SIZES:?})"
            )));
        }

        let c = self.cache_run_size;
        if !c.is_power_of_two() || c < n {
            return Err(Error::config(format!(
                "cacheRunSize {c} must be a power of two no smaller than registerBlockSize {n}"
            )));
        }

        if self.thread_count == 0 {
            return Err(Error::config("threadCount must be at least 1"));
        }

        if let Some(budget) = self.memory_budget_bytes {
            let run_buf = self.run_buffer_bytes();
            if budget < run_buf {
                return Err(Error::config(format!(
                    "memory budget of {budget} bytes is smaller than one run buffer ({run_buf} bytes)"
                )));
            }
            let affordable = budget / run_buf.max(1);
            if let Some(m) = self.merge_fan_in {
                if m > affordable {
                    return Err(Error::config(format!(
                        "mergeFanIn {m} needs {m} run buffers but the memory budget of {budget} bytes holds {affordable}"
                    )));
                }
            }
        }

        let m = self.fan_in();
        if m < 2 {
            return Err(Error::config(format!(
                "merge fan-in {m} admits no merge; at least 2 runs must fit"
            )));
        }

        Ok(())
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
