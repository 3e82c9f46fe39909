//! The CPU-side memory bus trait.
//!
//! The CPU is generic over this seam; the machine crate implements it with
//! the full FR2355 memory map, permission checks, and cycle statistics
//! behind it. Every method is fallible: unmapped addresses, permission
//! violations and misaligned word accesses surface as typed errors and abort
//! the current instruction.

use emu430_core::Result;

/// Memory bus as seen by the MSP430 CPU core.
///
/// Words are little-endian and must be even-addressed. `fetch_word` is the
/// instruction-stream access path: it behaves like `read_word` but is
/// validated as an Execute access and counted as a fetch.
pub trait Msp430Bus {
    /// Read a byte.
    fn read_byte(&mut self, addr: u16) -> Result<u8>;

    /// Read a little-endian word from an even address.
    fn read_word(&mut self, addr: u16) -> Result<u16>;

    /// Write a byte.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<()>;

    /// Write a little-endian word to an even address.
    fn write_word(&mut self, addr: u16, value: u16) -> Result<()>;

    /// Fetch an instruction or extension word from an even address.
    fn fetch_word(&mut self, addr: u16) -> Result<u16>;
}
