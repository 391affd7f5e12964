//! Slot handles into the value pool

use std::fmt;

/// Handle to a value stored in the pool.
///
/// The index is stable while the slot is allocated. The generation is bumped
/// every time the slot is released, so a handle kept past its release no
/// longer matches the entry and is rejected as `InvalidHandle` instead of
/// aliasing whatever value reused the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    index: u32,
    generation: u32,
}

impl Slot {
    pub(crate) fn new(
        index: u32,
        generation: u32,
    ) -> Self {
        Self { index, generation }
    }

    /// Position in the pool
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation the handle was issued with
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Slot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "slot@{}#{}", self.index, self.generation)
    }
}
