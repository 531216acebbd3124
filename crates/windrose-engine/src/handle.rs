//! Object handles and their allocation.
//!
//! An [`ObjectId`] packs a *generation* in the high 32 bits and a slot
//! *index* in the low 32 bits. Despawning bumps the slot's generation, so a
//! handle kept past its object's lifetime is rejected instead of silently
//! reaching whatever object reuses the slot.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// A generational handle to an object owned by a [`Stage`](crate::stage::Stage).
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Slot generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// ObjectAllocator
// ---------------------------------------------------------------------------

/// Hands out [`ObjectId`]s and recycles their slots.
///
/// Freed slots are reused in FIFO order so a single hot slot does not burn
/// through its generations.
#[derive(Debug, Default)]
pub struct ObjectAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    free: VecDeque<u32>,
}

impl ObjectAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle, reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> ObjectId {
        match self.free.pop_front() {
            Some(index) => {
                self.live[index as usize] = true;
                ObjectId::new(index, self.generations[index as usize])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.live.push(true);
                ObjectId::new(index, 0)
            }
        }
    }

    /// Free the slot behind `id`, invalidating every copy of the handle.
    ///
    /// Returns `false` if `id` was already stale.
    pub fn free(&mut self, id: ObjectId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.live[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push_back(id.index());
        true
    }

    /// Whether `id` names a slot that is in use at the handle's generation.
    pub fn is_live(&self, id: ObjectId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len() && self.live[idx] && self.generations[idx] == id.generation()
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|&&l| l).count()
    }

    /// Number of slots ever created (live or free).
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
