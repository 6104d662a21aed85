//! Reproducibility reports.
//!
//! A report is emitted after a successful sort or join. Two runs over the
//! same input with the same configuration must produce equal
//! `output_digest`s; the digest covers key, id and payload of every output
//! tuple in order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tiersort_core::error::{Error, Result};
use tiersort_core::hash::Hash256;
use tiersort_core::stage::Stage;
use tiersort_sched::plan::SortPlan;

/// Reports are engine output, so a serialization failure is internal.
fn pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::Invariant(format!("report serialization: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock and counters for one stage (one L2 entry covers all rounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_micros: u64,
    /// Tuples the stage consumed.
    pub tuples: usize,
    /// Sorted runs in the layout the stage handed on.
    pub runs_out: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortReport {
    pub id: ReportId,
    pub engine_version: String,
    /// Hash of the `SortConfig` the pipeline ran with.
    pub config_hash: Hash256,
    pub plan: SortPlan,
    /// Stages in execution order.
    pub stages: Vec<StageTiming>,
    /// Largest amount of budget-accounted scratch held at once.
    pub peak_scratch_bytes: usize,
    pub output_digest: Hash256,
    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl SortReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageTiming> {
        self.stages.iter().find(|t| t.stage == stage)
    }

    pub fn stage_order(&self) -> Vec<Stage> {
        self.stages.iter().map(|t| t.stage).collect()
    }

    pub fn total_micros(&self) -> u64 {
        self.stages.iter().map(|t| t.elapsed_micros).sum()
    }

    /// Same configuration and bit-identical output.
    pub fn reproduces(&self, other: &SortReport) -> bool {
        self.config_hash == other.config_hash && self.output_digest == other.output_digest
    }

    pub fn to_json(&self) -> Result<String> {
        pretty_json(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinReport {
    pub id: ReportId,
    pub left: SortReport,
    pub right: SortReport,
    pub join: StageTiming,
    pub output_count: u64,
}

impl JoinReport {
    pub fn to_json(&self) -> Result<String> {
        pretty_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiersort_core::config::SortConfig;
    use tiersort_core::hash::hash_bytes;

    fn report(digest: &[u8]) -> SortReport {
        let cfg = SortConfig::default().with_threads(1);
        SortReport {
            id: ReportId::new(),
            engine_version: tiersort_core::VERSION.to_string(),
            config_hash: hash_bytes(b"cfg"),
            plan: SortPlan::new(&cfg, 100).unwrap(),
            stages: vec![
                StageTiming {
                    stage: Stage::Ingest,
                    elapsed_micros: 3,
                    tuples: 100,
                    runs_out: 0,
                },
                StageTiming {
                    stage: Stage::RegisterSort,
                    elapsed_micros: 4,
                    tuples: 100,
                    runs_out: 7,
                },
            ],
            peak_scratch_bytes: 0,
            output_digest: hash_bytes(digest),
            started_ms: 0,
            finished_ms: 1,
        }
    }

    #[test]
    fn reproduction_ignores_id_and_timing() {
        let a = report(b"out");
        let mut b = report(b"out");
        b.stages[0].elapsed_micros = 999;
        assert_ne!(a.id, b.id);
        assert!(a.reproduces(&b));
        assert!(!a.reproduces(&report(b"other")));
    }

    #[test]
    fn serialization_failure_is_not_a_config_error() {
        use std::collections::HashMap;
        use tiersort_core::ErrorKind;

        // JSON object keys must be strings
        let bad: HashMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();
        let err = pretty_json(&bad).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)), "{err}");
        assert_eq!(err.kind(), ErrorKind::TaskFailure);
    }

    #[test]
    fn report_serializes_stage_labels() {
        let r = report(b"out");
        let json = r.to_json().unwrap();
        assert!(json.contains("\"register-sort\""));
        let back: SortReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stage_order(), vec![Stage::Ingest, Stage::RegisterSort]);
        assert_eq!(back.total_micros(), 7);
    }
}
