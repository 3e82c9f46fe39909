//! Access vocabulary: what kind of bus transaction, how wide, and where.
//!
//! Every memory operation is described by a [`BusAccess`] context. Regions
//! grant access through a [`Permissions`] mask checked against the requested
//! [`AccessKind`].

use core::fmt;

use bitflags::bitflags;

/// The kind of bus transaction being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Data read.
    Read,
    /// Data write.
    Write,
    /// Instruction fetch.
    Execute,
}

impl AccessKind {
    /// The permission bit this access kind requires.
    #[must_use]
    pub fn required_permission(self) -> Permissions {
        match self {
            Self::Read => Permissions::READ,
            Self::Write => Permissions::WRITE,
            Self::Execute => Permissions::EXECUTE,
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Transaction width. The MSP430 bus moves bytes or little-endian words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessWidth {
    /// 8-bit access.
    Byte,
    /// 16-bit access. Requires an even address.
    Word,
}

/// A fully-described bus transaction: address, kind, and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAccess {
    /// Target address.
    pub address: u16,
    /// Read, write, or instruction fetch.
    pub kind: AccessKind,
    /// Byte or word.
    pub width: AccessWidth,
}

impl BusAccess {
    #[must_use]
    pub const fn new(address: u16, kind: AccessKind, width: AccessWidth) -> Self {
        Self {
            address,
            kind,
            width,
        }
    }

    /// True for word accesses at an odd address.
    #[must_use]
    pub const fn misaligned(&self) -> bool {
        matches!(self.width, AccessWidth::Word) && self.address & 1 != 0
    }
}

impl fmt::Display for BusAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = match self.width {
            AccessWidth::Byte => "byte",
            AccessWidth::Word => "word",
        };
        write!(f, "{width} {} at {:#06X}", self.kind, self.address)
    }
}

bitflags! {
    /// Region permission mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

impl Permissions {
    /// Read/write data region.
    pub const RW: Self = Self::READ.union(Self::WRITE);
    /// Read/execute code region.
    pub const RX: Self = Self::READ.union(Self::EXECUTE);
    /// Read/write/execute region.
    pub const RWX: Self = Self::READ.union(Self::WRITE).union(Self::EXECUTE);
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |c: char, bit: Permissions| {
            if self.contains(bit) { c } else { '-' }
        };
        write!(
            f,
            "{}{}{}",
            mark('r', Permissions::READ),
            mark('w', Permissions::WRITE),
            mark('x', Permissions::EXECUTE)
        )
    }
}

/// Flash controller operations, named in protection errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    /// Byte or word program.
    Program,
    /// Sector or mass erase.
    Erase,
    /// Key-gated unlock.
    Unlock,
    /// Explicit lock.
    Lock,
}

impl fmt::Display for FlashOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program => write!(f, "program"),
            Self::Erase => write!(f, "erase"),
            Self::Unlock => write!(f, "unlock"),
            Self::Lock => write!(f, "lock"),
        }
    }
}
