//! Access and violation events.
//!
//! The controller reports each completed access and each rejection to a
//! caller-provided observer. Events fire synchronously before the operation
//! returns; handlers run on the caller's thread and must not re-enter the
//! controller.

use emu430_core::{BusAccess, Error};

use crate::map::MemoryRegion;

/// Observer for memory traffic.
///
/// Both methods default to no-ops so implementors subscribe to only what
/// they need.
pub trait AccessObserver {
    /// A validated access completed. `value` is the data read; writes carry
    /// `None`.
    fn on_access(
        &mut self,
        access: &BusAccess,
        region: &MemoryRegion,
        cycles: u64,
        value: Option<u16>,
    ) {
        let _ = (access, region, cycles, value);
    }

    /// An access was rejected.
    fn on_violation(&mut self, access: &BusAccess, error: &Error) {
        let _ = (access, error);
    }
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl AccessObserver for NullObserver {}
