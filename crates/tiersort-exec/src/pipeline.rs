//! Pipeline: ingest, L1 → L2 → L3 per relation, then the merge join.
//!
//! Behavior:
//! - Validates the config and generates the network table once, at `new`.
//! - Reads the relation source in parallel; each tuple gets its source
//!   position as `TupleId`.
//! - Runs the three sort levels strictly in order on one worker pool; each
//!   level returns only after all of its tasks finished.
//! - Enforces the memory budget on transient stage scratch and reports the
//!   peak in the `SortReport`.
//! - Any error aborts the sort; no partially sorted output is returned.

use std::iter;

use tiersort_core::budget::MemoryBudget;
use tiersort_core::config::SortConfig;
use tiersort_core::error::Result;
use tiersort_core::hash::{digest_tuples, hash_serde, Hash256};
use tiersort_core::id::TupleId;
use tiersort_core::relation::RelationSource;
use tiersort_core::stage::Stage;
use tiersort_core::tuple::Tuple;
use tiersort_core::VERSION;

use tiersort_mem::guard::MemoryBudgetImpl;

use tiersort_ops::bitonic::BitonicMergeStage;
use tiersort_ops::join::{JoinedTuple, MergeJoinStage};
use tiersort_ops::merge::ExternalMergeStage;
use tiersort_ops::network::{NetworkTable, RegisterSortStage};
use tiersort_ops::traits::{SortStage, StageContext};

use tiersort_sched::fail_point;
use tiersort_sched::plan::SortPlan;
use tiersort_sched::pool::WorkerPool;
use tiersort_sched::verify;

use crate::metrics::{now_ms, StageTimer};
use crate::report::{JoinReport, ReportId, SortReport, StageTiming};

/// Source positions read per ingest task.
const INGEST_CHUNK: usize = 4096;

/// A fully sorted relation and the report of the sort that produced it.
#[derive(Debug, Clone)]
pub struct SortedRelation {
    pub tuples: Vec<Tuple>,
    pub report: SortReport,
}

impl SortedRelation {
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }
}

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub tuples: Vec<JoinedTuple>,
    pub report: JoinReport,
}

/// Owns the config, worker pool, budget and network table shared by every
/// sort it runs.
pub struct Pipeline {
    cfg: SortConfig,
    config_hash: Hash256,
    pool: WorkerPool,
    budget: MemoryBudgetImpl,
    networks: NetworkTable,
}

impl Pipeline {
    pub fn new(cfg: SortConfig) -> Result<Self> {
        cfg.validate()?;
        let networks = NetworkTable::generate();
        networks.get(cfg.register_block_size)?;
        let pool = WorkerPool::new(cfg.thread_count)?;
        let budget = match cfg.memory_budget_bytes {
            Some(bytes) => MemoryBudgetImpl::new(bytes),
            None => MemoryBudgetImpl::unbounded(),
        };
        let config_hash = hash_serde(&cfg)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            block_size = cfg.register_block_size,
            run_size = cfg.cache_run_size,
            fan_in = cfg.fan_in(),
            threads = cfg.thread_count,
            strategy = %cfg.merge_strategy,
            "pipeline ready"
        );

        Ok(Self {
            cfg,
            config_hash,
            pool,
            budget,
            networks,
        })
    }

    /// Pipeline with `SortConfig::from_env()`.
    pub fn from_env() -> Result<Self> {
        Self::new(SortConfig::from_env())
    }

    pub fn config(&self) -> &SortConfig {
        &self.cfg
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }

    pub fn networks(&self) -> &NetworkTable {
        &self.networks
    }

    /// Sort everything `source` holds. The source is only read.
    pub fn sort(&self, source: &dyn RelationSource) -> Result<SortedRelation> {
        let started_ms = now_ms();
        let n = source.cardinality();
        let plan = SortPlan::new(&self.cfg, n)?;

        let timer = StageTimer::start(Stage::Ingest, n);
        let buf = self.ingest(source)?;
        let stages = vec![timer.finish(0)];

        self.sort_buffer(buf, plan, started_ms, stages)
    }

    /// Sort tuples the caller already holds. Ids are reassigned from the
    /// tuples' positions in `tuples`, so equal keys keep their given order.
    pub fn sort_tuples(&self, tuples: Vec<Tuple>) -> Result<SortedRelation> {
        let started_ms = now_ms();
        let plan = SortPlan::new(&self.cfg, tuples.len())?;

        let timer = StageTimer::start(Stage::Ingest, tuples.len());
        let buf: Vec<Tuple> = tuples
            .into_iter()
            .enumerate()
            .map(|(pos, mut t)| {
                t.id = TupleId::from_position(pos);
                t
            })
            .collect();
        let stages = vec![timer.finish(0)];

        self.sort_buffer(buf, plan, started_ms, stages)
    }

    fn ingest(&self, source: &dyn RelationSource) -> Result<Vec<Tuple>> {
        let n = source.cardinality();
        let mut buf: Vec<Tuple> = iter::repeat_with(Tuple::default).take(n).collect();
        let tasks: Vec<(usize, &mut [Tuple])> = buf
            .chunks_mut(INGEST_CHUNK)
            .enumerate()
            .map(|(i, slots)| (i * INGEST_CHUNK, slots))
            .collect();

        self.pool.run_stage(Stage::Ingest, tasks, |(base, slots)| {
            fail_point!(Stage::Ingest, "ingest-read");
            for (offset, slot) in slots.iter_mut().enumerate() {
                let position = base + offset;
                let (key, payload) = source.read(position)?;
                *slot = Tuple::new(key, TupleId::from_position(position), payload);
            }
            Ok(())
        })?;
        Ok(buf)
    }

    fn sort_buffer(
        &self,
        mut buf: Vec<Tuple>,
        plan: SortPlan,
        started_ms: u64,
        mut stages: Vec<StageTiming>,
    ) -> Result<SortedRelation> {
        self.budget.reset_peak();
        let ctx = StageContext::new(&self.pool, &self.budget);

        let levels: [Box<dyn SortStage>; 3] = [
            Box::new(RegisterSortStage::new(self.networks.get(plan.block_size)?.clone())),
            Box::new(BitonicMergeStage::from_plan(&plan)),
            Box::new(ExternalMergeStage::from_plan(&plan)),
        ];
        for level in &levels {
            let need = level.memory_need(&plan);
            need.ensure_fits(level.stage(), self.budget.capacity_bytes())?;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                stage = %level.stage(),
                per_task_bytes = need.per_task_bytes,
                estimated_peak = need.estimate_peak(),
                "stage scratch footprint"
            );
        }

        let mut runs = Vec::new();
        for level in &levels {
            let timer = StageTimer::start(level.stage(), buf.len());
            runs = level.execute(&ctx, &mut buf, runs)?;
            if cfg!(debug_assertions) {
                verify::assert_runs_tile(&runs, buf.len());
                verify::assert_runs_sorted(&buf, &runs);
            }
            stages.push(timer.finish(runs.len()));
        }
        if cfg!(debug_assertions) {
            verify::assert_no_sentinels(&buf);
        }

        let report = SortReport {
            id: ReportId::new(),
            engine_version: VERSION.to_string(),
            config_hash: self.config_hash,
            plan,
            stages,
            peak_scratch_bytes: self.budget.peak_bytes(),
            output_digest: digest_tuples(&buf),
            started_ms,
            finished_ms: now_ms(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            tuples = buf.len(),
            runs = report.plan.runs,
            strategy = %report.plan.strategy,
            passes = report.plan.passes,
            digest = %report.output_digest,
            "relation sorted"
        );

        Ok(SortedRelation { tuples: buf, report })
    }

    /// Join two relations that are already sorted by key.
    pub fn merge_join(
        &self,
        left: &[Tuple],
        right: &[Tuple],
    ) -> Result<(Vec<JoinedTuple>, StageTiming)> {
        let ctx = StageContext::new(&self.pool, &self.budget);
        let timer = StageTimer::start(Stage::MergeJoin, left.len() + right.len());
        let out = MergeJoinStage.execute(&ctx, left, right)?;
        Ok((out, timer.finish(1)))
    }

    /// Sort both sources, then merge-join them.
    pub fn sort_merge_join(
        &self,
        left: &dyn RelationSource,
        right: &dyn RelationSource,
    ) -> Result<JoinOutput> {
        let left = self.sort(left)?;
        let right = self.sort(right)?;
        let (tuples, join) = self.merge_join(&left.tuples, &right.tuples)?;
        let report = JoinReport {
            id: ReportId::new(),
            left: left.report,
            right: right.report,
            join,
            output_count: tuples.len() as u64,
        };
        Ok(JoinOutput { tuples, report })
    }
}
