//! The FR2355 machine: CPU plus memory controller.

use cpu_msp430::Msp430;
use emu430_core::{NullPeripherals, PeripheralBus, Result};

use crate::controller::MemoryController;

/// Address of the reset vector.
pub const RESET_VECTOR: u16 = 0xFFFE;

/// An MSP430FR2355 system.
pub struct Fr2355<P: PeripheralBus = NullPeripherals> {
    pub cpu: Msp430,
    pub mem: MemoryController<P>,
    total_cycles: u64,
}

impl Fr2355<NullPeripherals> {
    /// Machine with no peripherals attached.
    #[must_use]
    pub fn new() -> Self {
        Self::with_peripherals(NullPeripherals)
    }
}

impl Default for Fr2355<NullPeripherals> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PeripheralBus> Fr2355<P> {
    #[must_use]
    pub fn with_peripherals(peripherals: P) -> Self {
        Self {
            cpu: Msp430::new(),
            mem: MemoryController::with_peripherals(peripherals),
            total_cycles: 0,
        }
    }

    /// Power-on/BOR reset: memory to its erased state, registers cleared,
    /// then PC loaded from the little-endian word at 0xFFFE and
    /// word-aligned. Erases everything loaded into FRAM; load images after
    /// this, then [`Self::boot`].
    pub fn reset(&mut self) {
        self.mem.reset();
        self.boot();
    }

    /// Warm boot: clear the CPU registers and load PC from the reset
    /// vector, leaving memory contents in place.
    pub fn boot(&mut self) {
        self.cpu.reset();
        self.total_cycles = 0;
        let vector = self.mem.peek_word(RESET_VECTOR).unwrap_or(0xFFFF);
        self.cpu.regs.set_pc(vector);
    }

    /// Execute one instruction. The consumed cycles also tick the flash
    /// controller's busy countdown.
    pub fn step(&mut self) -> Result<u64> {
        let cycles = self.cpu.step(&mut self.mem)?;
        self.mem.tick(cycles);
        self.total_cycles += cycles;
        Ok(cycles)
    }

    /// Cycles consumed since the last reset.
    #[must_use]
    pub const fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Load raw bytes into backing stores (see
    /// [`MemoryController::load_image`]). File-format parsing lives with
    /// the caller.
    pub fn load_image(&mut self, addr: u16, bytes: &[u8]) -> Result<()> {
        self.mem.load_image(addr, bytes)
    }

    /// Point the reset vector at `entry`.
    pub fn set_reset_vector(&mut self, entry: u16) -> Result<()> {
        self.mem.load_image(RESET_VECTOR, &entry.to_le_bytes())
    }
}
