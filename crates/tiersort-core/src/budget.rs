//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `tiersort-mem`. Stage code only sees
//! these traits, so it can reserve scratch space without depending on how the
//! accounting is done.

/// A reservation returned by a memory budget.
///
/// Must release its bytes on Drop, be `Send` (tasks move between workers), and
/// stay correct if the owning task panics.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;
    /// Debug tag naming the buffer this guard pays for.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A cap on the transient buffers stage tasks allocate (padded bitonic
/// scratch, merge cursor arenas).
///
/// Tasks call `try_acquire` before allocating; on `None` the task fails and
/// the stage aborts. There is no waiting for memory to free up.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to reserve `bytes`. Returns a guard on success.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Approximate currently reserved bytes (advisory; not a correctness API).
    fn used_bytes(&self) -> usize;
}
