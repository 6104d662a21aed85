//! Stage footprints: how much scratch a stage's tasks reserve.
//!
//! The pipeline checks these against the budget before a stage starts so an
//! infeasible configuration fails up front instead of mid-stage.

use serde::{Deserialize, Serialize};

use tiersort_core::error::{Error, Result};
use tiersort_core::stage::Stage;

/// Coarse scratch model for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Largest reservation a single task makes.
    pub per_task_bytes: usize,
    /// Upper bound on tasks holding a reservation at once.
    pub concurrent_tasks: usize,
}

impl Footprint {
    pub fn none() -> Self {
        Self::default()
    }

    /// Peak bytes if every concurrent task holds its largest reservation.
    pub fn estimate_peak(&self) -> usize {
        self.per_task_bytes.saturating_mul(self.concurrent_tasks)
    }

    /// A single task must fit on its own; contention between tasks is
    /// detected at reservation time instead.
    pub fn ensure_fits(&self, stage: Stage, capacity_bytes: usize) -> Result<()> {
        if self.per_task_bytes > capacity_bytes {
            return Err(Error::config(format!(
                "stage {stage} needs {} bytes of scratch per task but the budget is {capacity_bytes}",
                self.per_task_bytes
            )));
        }
        Ok(())
    }
}
