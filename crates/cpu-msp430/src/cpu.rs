//! MSP430 CPU core.
//!
//! The CPU runs one instruction to completion per [`Msp430::step`] call:
//! fetch at PC, decode, resolve operands (consuming extension words from the
//! instruction stream), execute, write back, and return the cycle count from
//! the SLAU445I tables. There are no internal threads and no suspension
//! points; instruction execution is atomic with respect to the caller.

use emu430_core::Result;

use crate::bus::Msp430Bus;
use crate::decode;
use crate::instruction::Instruction;
use crate::registers::RegisterFile;

/// MSP430 CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct Msp430 {
    /// The register file. Public for inspection and test setup, like the
    /// memory-mapped registers it models.
    pub regs: RegisterFile,
}

impl Msp430 {
    /// Create a CPU with all registers zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
        }
    }

    /// Reset all registers. The caller loads PC from the reset vector.
    pub const fn reset(&mut self) {
        self.regs.reset();
    }

    /// Decode one instruction word without touching CPU or memory state.
    pub fn decode(word: u16) -> Result<Instruction> {
        decode::decode(word)
    }

    /// Execute one instruction and return the cycles it consumed.
    ///
    /// On error the PC has advanced past the words already fetched, but no
    /// operand writeback is left half-done.
    pub fn step<B: Msp430Bus>(&mut self, bus: &mut B) -> Result<u64> {
        let pc = self.regs.pc();
        let word = bus.fetch_word(pc)?;
        self.regs.advance_pc(2);
        let instr = decode::decode(word)?;
        self.execute(&instr, bus)
    }
}
