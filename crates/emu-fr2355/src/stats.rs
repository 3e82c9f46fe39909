//! Memory access statistics.

/// Counters maintained by the memory controller.
///
/// `total_operations()` always equals reads + writes + instruction fetches;
/// violations and cycles are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    /// Successful data reads.
    pub reads: u64,
    /// Successful data writes.
    pub writes: u64,
    /// Successful instruction fetches.
    pub instruction_fetches: u64,
    /// Rejected accesses of any kind.
    pub violations: u64,
    /// Access cycles consumed by successful operations.
    pub access_cycles: u64,
}

impl MemoryStats {
    /// Total successful operations.
    #[must_use]
    pub const fn total_operations(&self) -> u64 {
        self.reads + self.writes + self.instruction_fetches
    }

    /// Zero all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
