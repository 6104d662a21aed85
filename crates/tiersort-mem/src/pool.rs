//! Budget-accounted tuple scratch buffers.
//!
//! The padded bitonic merge and the merge cursor arenas allocate through
//! here; relation buffers themselves are owned by the pipeline.

use std::ops::{Deref, DerefMut};

use tiersort_core::budget::{BudgetGuard, MemoryBudget};
use tiersort_core::tuple::Tuple;

use crate::error::{Error, Result};
use crate::guard::BudgetGuardImpl;

/// Bytes charged for `slots` tuple slots.
pub fn tuple_slots_bytes(slots: usize) -> usize {
    slots.saturating_mul(std::mem::size_of::<Tuple>())
}

/// Vector of tuples whose slot capacity is reserved against a budget.
/// The reservation is returned when the buffer drops.
pub struct TupleBuf {
    guard: BudgetGuardImpl,
    buf: Vec<Tuple>,
}

impl TupleBuf {
    /// Reserve `slots` tuple slots and allocate an empty buffer of that capacity.
    pub fn with_capacity<B>(budget: &B, slots: usize, tag: &'static str) -> Result<Self>
    where
        B: MemoryBudget<Guard = BudgetGuardImpl> + ?Sized,
    {
        let requested = tuple_slots_bytes(slots);
        let guard = budget
            .try_acquire(requested, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested,
                capacity: budget.capacity_bytes(),
                used: budget.used_bytes(),
            })?;

        Ok(Self {
            guard,
            buf: Vec::with_capacity(slots),
        })
    }

    /// Current accounted size (bytes).
    pub fn accounted_bytes(&self) -> usize {
        self.guard.bytes()
    }
}

impl Deref for TupleBuf {
    type Target = Vec<Tuple>;
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for TupleBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}
