//! Frame slots.

/// Index into the ring of per-frame host-writable state.
///
/// A slot is derived from the running submission count, so frame `n` and
/// frame `n + ring_size` share a slot and never overlap in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FrameSlot(u32);

impl FrameSlot {
    /// Create a slot from a raw index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Slot used by the submission with the given running count.
    ///
    /// A ring size of zero is treated as one.
    pub fn from_submission(count: u64, ring_size: u32) -> Self {
        Self((count % ring_size.max(1) as u64) as u32)
    }

    /// Raw index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {}", self.0)
    }
}
