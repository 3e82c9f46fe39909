//! MSP430FR2355 machine: memory subsystem and machine façade.
//!
//! The FR2355's address space mixes volatile SRAM, non-volatile FRAM,
//! segment-protected information memory, a bootstrap loader, memory-mapped
//! peripherals, and the interrupt vector table. The [`MemoryController`]
//! arbitrates every access against the region map, tracks statistics, and
//! reports access and violation events; [`Fr2355`] ties the controller to
//! the CPU core.

mod controller;
mod events;
mod fr2355;
mod fram;
mod info;
mod map;
mod ram;
mod stats;
mod validator;

pub use controller::MemoryController;
pub use events::{AccessObserver, NullObserver};
pub use fr2355::{Fr2355, RESET_VECTOR};
pub use fram::{ControllerState, FramConfig, FramMemory, ProtectionLevel, SECTOR_SIZE};
pub use info::{InfoSegment, InformationMemory, SEGMENT_SIZE};
pub use map::{MemoryMap, MemoryRegion, RegionKind};
pub use ram::RandomAccessMemory;
pub use stats::MemoryStats;
pub use validator::AccessValidator;
