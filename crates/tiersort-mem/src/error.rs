use thiserror::Error;

use tiersort_core::stage::Stage;

/// Result type local to tiersort-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },
}

impl Error {
    /// Attribute the failure to the stage whose task asked for memory.
    pub fn into_task_failure(self, stage: Stage) -> tiersort_core::Error {
        tiersort_core::Error::task(stage, self.to_string())
    }
}
