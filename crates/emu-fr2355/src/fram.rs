//! Code/data FRAM with the legacy flash-controller protocol.
//!
//! FRAM allows byte-level overwrite with no erase phase, but the historical
//! MSP430 flash protection protocol is kept as the default observable
//! contract: a key-gated lock, program/erase busy periods, protection
//! levels, and the program rule that bits may only be cleared.
//!
//! [`FramConfig::strict_fram`] switches a store to true-FRAM semantics:
//! writes land directly, with no unlock and no bits-only-cleared rule. The
//! state machine still tracks lock state for protocol users.

use emu430_core::{Error, FlashOp, Result};
use log::debug;

/// Erase granularity for the sector-erase operation.
pub const SECTOR_SIZE: usize = 512;

/// High byte required by the unlock key.
const UNLOCK_KEY: u8 = 0xA5;

/// Busy cycles for a byte program.
const BYTE_PROGRAM_CYCLES: u64 = 30;
/// Busy cycles for a word program.
const WORD_PROGRAM_CYCLES: u64 = 30;
/// Busy cycles for a sector erase.
const SECTOR_ERASE_CYCLES: u64 = 4819;
/// Busy cycles for a mass erase.
const MASS_ERASE_CYCLES: u64 = 10593;

/// Flash controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Programming and erase rejected until unlocked.
    #[default]
    Locked,
    /// Ready for program/erase operations.
    Unlocked,
    /// A program operation is draining its busy cycles.
    Programming,
    /// An erase operation is draining its busy cycles.
    Erasing,
}

/// Protection level of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtectionLevel {
    /// No restriction.
    #[default]
    None,
    /// Programming and erase are blocked.
    WriteProtected,
    /// Unlock is blocked.
    SecurityLocked,
    /// Protection level can no longer be changed.
    PermanentlyLocked,
}

/// FRAM behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramConfig {
    /// True-FRAM mode: byte-level overwrite without unlock, no
    /// bits-only-cleared rule.
    pub strict_fram: bool,
}

/// The code/data FRAM store.
#[derive(Debug, Clone)]
pub struct FramMemory {
    name: &'static str,
    base: u16,
    data: Box<[u8]>,
    state: ControllerState,
    protection: ProtectionLevel,
    cycles_remaining: u64,
    config: FramConfig,
}

impl FramMemory {
    /// Create an erased (0xFF) store with the default flash-style protocol.
    #[must_use]
    pub fn new(name: &'static str, base: u16, size: usize) -> Self {
        Self::with_config(name, base, size, FramConfig::default())
    }

    /// Create an erased store with explicit behavior switches.
    #[must_use]
    pub fn with_config(name: &'static str, base: u16, size: usize, config: FramConfig) -> Self {
        Self {
            name,
            base,
            data: vec![0xFF; size].into_boxed_slice(),
            state: ControllerState::Locked,
            protection: ProtectionLevel::None,
            cycles_remaining: 0,
            config,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    #[must_use]
    pub const fn protection(&self) -> ProtectionLevel {
        self.protection
    }

    /// True while a program or erase operation is draining cycles.
    #[must_use]
    pub const fn busy(&self) -> bool {
        matches!(
            self.state,
            ControllerState::Programming | ControllerState::Erasing
        )
    }

    fn offset(&self, addr: u16, span: u16) -> Result<usize> {
        let start = addr.wrapping_sub(self.base) as usize;
        let end = start + span as usize;
        if addr < self.base || end > self.data.len() {
            return Err(Error::OutOfBounds {
                address: addr,
                store: self.name,
            });
        }
        Ok(start)
    }

    // === Reads (any state) ===

    pub fn read_byte(&self, addr: u16) -> Result<u8> {
        let i = self.offset(addr, 1)?;
        Ok(self.data[i])
    }

    pub fn read_word(&self, addr: u16) -> Result<u16> {
        if addr & 1 != 0 {
            return Err(Error::MemoryAlignment { address: addr });
        }
        let i = self.offset(addr, 2)?;
        Ok(u16::from_le_bytes([self.data[i], self.data[i + 1]]))
    }

    // === Programming ===

    /// Check that a program operation may start, then mark the busy period.
    fn begin_program(&mut self, addr: u16, cycles: u64) -> Result<()> {
        if self.state != ControllerState::Unlocked {
            return Err(Error::FlashProtection {
                address: addr,
                operation: FlashOp::Program,
            });
        }
        if self.protection == ProtectionLevel::WriteProtected {
            return Err(Error::FlashProtection {
                address: addr,
                operation: FlashOp::Program,
            });
        }
        self.state = ControllerState::Programming;
        self.cycles_remaining = cycles;
        Ok(())
    }

    /// Program one byte.
    ///
    /// Under the flash protocol the store must be unlocked and the new value
    /// may only clear bits. In strict-FRAM mode the byte is simply stored.
    pub fn program_byte(&mut self, addr: u16, value: u8) -> Result<()> {
        let i = self.offset(addr, 1)?;
        if self.config.strict_fram {
            self.data[i] = value;
            return Ok(());
        }
        if value & self.data[i] != value {
            return Err(Error::FlashProtection {
                address: addr,
                operation: FlashOp::Program,
            });
        }
        self.begin_program(addr, BYTE_PROGRAM_CYCLES)?;
        self.data[i] = value;
        Ok(())
    }

    /// Program one little-endian word at an even address.
    pub fn program_word(&mut self, addr: u16, value: u16) -> Result<()> {
        if addr & 1 != 0 {
            return Err(Error::MemoryAlignment { address: addr });
        }
        let i = self.offset(addr, 2)?;
        let bytes = value.to_le_bytes();
        if self.config.strict_fram {
            self.data[i..i + 2].copy_from_slice(&bytes);
            return Ok(());
        }
        let current = u16::from_le_bytes([self.data[i], self.data[i + 1]]);
        if value & current != value {
            return Err(Error::FlashProtection {
                address: addr,
                operation: FlashOp::Program,
            });
        }
        self.begin_program(addr, WORD_PROGRAM_CYCLES)?;
        self.data[i..i + 2].copy_from_slice(&bytes);
        Ok(())
    }

    // === Erase ===

    /// Erase the 512-byte sector containing `addr` back to 0xFF.
    pub fn erase_sector(&mut self, addr: u16) -> Result<()> {
        let i = self.offset(addr, 1)?;
        self.begin_erase(addr, SECTOR_ERASE_CYCLES)?;
        let sector = i / SECTOR_SIZE * SECTOR_SIZE;
        self.data[sector..sector + SECTOR_SIZE].fill(0xFF);
        Ok(())
    }

    /// Erase the whole store back to 0xFF.
    pub fn mass_erase(&mut self) -> Result<()> {
        self.begin_erase(self.base, MASS_ERASE_CYCLES)?;
        self.data.fill(0xFF);
        Ok(())
    }

    fn begin_erase(&mut self, addr: u16, cycles: u64) -> Result<()> {
        if self.state != ControllerState::Unlocked
            || self.protection == ProtectionLevel::WriteProtected
        {
            return Err(Error::FlashProtection {
                address: addr,
                operation: FlashOp::Erase,
            });
        }
        self.state = ControllerState::Erasing;
        self.cycles_remaining = cycles;
        Ok(())
    }

    // === Lock protocol ===

    /// Unlock with a 16-bit key whose high byte must be 0xA5.
    pub fn unlock(&mut self, key: u16) -> Result<()> {
        if self.protection == ProtectionLevel::SecurityLocked {
            return Err(Error::FlashProtection {
                address: self.base,
                operation: FlashOp::Unlock,
            });
        }
        if (key >> 8) as u8 != UNLOCK_KEY || self.busy() {
            return Err(Error::FlashProtection {
                address: self.base,
                operation: FlashOp::Unlock,
            });
        }
        debug!("{} unlocked", self.name);
        self.state = ControllerState::Unlocked;
        Ok(())
    }

    /// Return to the locked state. Rejected while an operation is running.
    pub fn lock(&mut self) -> Result<()> {
        if self.busy() {
            return Err(Error::FlashProtection {
                address: self.base,
                operation: FlashOp::Lock,
            });
        }
        self.state = ControllerState::Locked;
        Ok(())
    }

    /// Change the protection level. Permanently-locked stores refuse.
    pub fn set_protection(&mut self, level: ProtectionLevel) -> Result<()> {
        if self.protection == ProtectionLevel::PermanentlyLocked {
            return Err(Error::FlashProtection {
                address: self.base,
                operation: FlashOp::Lock,
            });
        }
        self.protection = level;
        Ok(())
    }

    /// Drain busy cycles. When the count reaches zero the controller
    /// returns to Unlocked.
    pub fn update(&mut self, cycles: u64) {
        if !self.busy() {
            return;
        }
        self.cycles_remaining = self.cycles_remaining.saturating_sub(cycles);
        if self.cycles_remaining == 0 {
            self.state = ControllerState::Unlocked;
        }
    }

    /// Erase to 0xFF and return to the locked state.
    ///
    /// A permanently-locked protection level survives reset; anything else
    /// clears.
    pub fn reset(&mut self) {
        self.data.fill(0xFF);
        self.state = ControllerState::Locked;
        self.cycles_remaining = 0;
        if self.protection != ProtectionLevel::PermanentlyLocked {
            self.protection = ProtectionLevel::None;
        }
    }

    /// Copy raw bytes in. Used by image loaders.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) -> Result<()> {
        let i = self.offset(addr, u16::try_from(bytes.len()).unwrap_or(u16::MAX))?;
        self.data[i..i + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Read without side effects, `None` when out of range.
    #[must_use]
    pub fn peek(&self, addr: u16) -> Option<u8> {
        self.offset(addr, 1).ok().map(|i| self.data[i])
    }
}
