//! Pipeline stage labels, used for error attribution and reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The strictly ordered stages of the pipeline. `Ord` follows execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Ingest,
    RegisterSort,
    BitonicMerge,
    ExternalMerge,
    MergeJoin,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::RegisterSort => "l1-network",
            Stage::BitonicMerge => "l2-bitonic",
            Stage::ExternalMerge => "l3-external",
            Stage::MergeJoin => "merge-join",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
