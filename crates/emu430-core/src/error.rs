//! The emulator core's error type.
//!
//! Errors are raised at the deepest layer that detects them (store,
//! validator, decoder) and propagate unchanged to the caller of `step`.
//! Nothing in the core swallows one.

use thiserror::Error;

use crate::access::{AccessKind, FlashOp, Permissions};

/// Result alias used across the emulator crates.
pub type Result<T> = core::result::Result<T, Error>;

/// All failure modes of the emulator core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The raw word could not be decoded: unknown opcode, invalid
    /// addressing-mode combination, or malformed sub-encoding.
    #[error("invalid instruction word {word:#06X}")]
    InvalidInstruction {
        /// The undecodable instruction word.
        word: u16,
    },

    /// Address unmapped, or the region does not grant the requested access.
    #[error("{kind} access denied at {address:#06X} (region permissions: {})",
            .permissions.map_or_else(|| "unmapped".to_string(), |p| p.to_string()))]
    MemoryAccess {
        /// Faulting address.
        address: u16,
        /// The access that was requested.
        kind: AccessKind,
        /// Permissions of the resolved region, `None` if unmapped.
        permissions: Option<Permissions>,
    },

    /// Word access at an odd address.
    #[error("misaligned word access at {address:#06X}")]
    MemoryAlignment {
        /// The odd address.
        address: u16,
    },

    /// Address lies outside a backing store's configured range.
    #[error("address {address:#06X} out of bounds for {store}")]
    OutOfBounds {
        /// Faulting address.
        address: u16,
        /// Name of the store that rejected the access.
        store: &'static str,
    },

    /// Program or erase against a protected or locked region, or a program
    /// that would set a cleared bit.
    #[error("flash {operation} rejected at {address:#06X}")]
    FlashProtection {
        /// Faulting address.
        address: u16,
        /// The rejected operation.
        operation: FlashOp,
    },

    /// PUSH/CALL/RETI would touch memory outside the address space.
    #[error("stack fault at SP={address:#06X}")]
    StackFault {
        /// Stack pointer value at the fault.
        address: u16,
    },

    /// Jump offset outside the valid −511..=+512 word range.
    #[error("jump offset {offset} words out of range")]
    JumpRange {
        /// The rejected word offset.
        offset: i16,
    },

    /// A caller-supplied region set contains overlapping regions.
    #[error("memory regions overlap: {first} and {second}")]
    RegionOverlap {
        /// Description of the lower region.
        first: &'static str,
        /// Description of the overlapping region.
        second: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_address_and_kind() {
        let err = Error::MemoryAccess {
            address: 0x0300,
            kind: AccessKind::Write,
            permissions: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x0300"), "{msg}");
        assert!(msg.contains("write"), "{msg}");
        assert!(msg.contains("unmapped"), "{msg}");
    }

    #[test]
    fn display_includes_region_permissions_when_mapped() {
        let err = Error::MemoryAccess {
            address: 0x1000,
            kind: AccessKind::Write,
            permissions: Some(Permissions::RX),
        };
        assert!(err.to_string().contains("r-x"));
    }
}
