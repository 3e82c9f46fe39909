//! Addressing-mode resolution.
//!
//! The MSP430 encodes seven addressing modes in two bits (As) for sources
//! and one bit (Ad) for destinations, with R0/R2/R3 overloading the
//! encodings: R0 gives symbolic and immediate modes, R2 gives absolute
//! addressing plus the +4/+8 constants, and R3 exists solely as a constant
//! generator.
//!
//! Constant-generator operands carry their synthesized value in the decoded
//! mode (`Constant`), so no information is lost between decode and execute;
//! they never touch memory and never consume an extension word.

use emu430_core::{Error, Result};

use crate::registers::{CG2, PC, SR};

/// A resolved addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Operand in the register itself.
    Register,
    /// `X(Rn)`: memory at register + extension-word offset.
    Indexed,
    /// `@Rn`: memory at the register.
    Indirect,
    /// `@Rn+`: memory at the register, then post-increment.
    IndirectAutoInc,
    /// `#N`: the extension word is the operand.
    Immediate,
    /// `&ADDR`: memory at the extension word.
    Absolute,
    /// `ADDR`: memory at PC + extension-word offset.
    Symbolic,
    /// Constant generator: the operand is a synthesized constant.
    Constant(i8),
}

impl AddrMode {
    /// True if this mode consumes an extension word from the instruction
    /// stream.
    #[must_use]
    pub const fn needs_extension_word(self) -> bool {
        matches!(
            self,
            Self::Indexed | Self::Immediate | Self::Absolute | Self::Symbolic
        )
    }

    /// The mode used for cycle lookup: constant-generator sources count as
    /// register mode.
    #[must_use]
    pub const fn for_cycle_lookup(self) -> Self {
        match self {
            Self::Constant(_) => Self::Register,
            other => other,
        }
    }
}

/// Resolve a source addressing mode from a register and the 2-bit As field.
pub fn source_mode(reg: u8, as_bits: u8, word: u16) -> Result<AddrMode> {
    if reg > 15 || as_bits > 3 {
        return Err(Error::InvalidInstruction { word });
    }
    let mode = match (reg, as_bits) {
        (PC, 0b00) => AddrMode::Register,
        (PC, 0b01) => AddrMode::Symbolic,
        (PC, 0b10) => AddrMode::Indirect,
        (PC, 0b11) => AddrMode::Immediate,

        (SR, 0b00) => AddrMode::Register,
        (SR, 0b01) => AddrMode::Absolute,
        (SR, 0b10) => AddrMode::Constant(4),
        (SR, 0b11) => AddrMode::Constant(8),

        (CG2, 0b00) => AddrMode::Constant(0),
        (CG2, 0b01) => AddrMode::Constant(1),
        (CG2, 0b10) => AddrMode::Constant(2),
        (CG2, 0b11) => AddrMode::Constant(-1),

        (_, 0b00) => AddrMode::Register,
        (_, 0b01) => AddrMode::Indexed,
        (_, 0b10) => AddrMode::Indirect,
        (_, _) => AddrMode::IndirectAutoInc,
    };
    Ok(mode)
}

/// Resolve a destination addressing mode from a register and the 1-bit Ad
/// field.
pub fn destination_mode(reg: u8, ad_bit: u8, word: u16) -> Result<AddrMode> {
    if reg > 15 || ad_bit > 1 {
        return Err(Error::InvalidInstruction { word });
    }
    let mode = if ad_bit == 0 {
        AddrMode::Register
    } else {
        match reg {
            PC => AddrMode::Symbolic,
            SR => AddrMode::Absolute,
            _ => AddrMode::Indexed,
        }
    };
    Ok(mode)
}
