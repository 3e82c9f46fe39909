//! Core types shared across the MSP430 emulator workspace.
//!
//! This crate holds the vocabulary the CPU and machine crates agree on:
//! the typed error enum, the access-context types used on every bus
//! transaction, region permission masks, and the peripheral-bus seam the
//! memory controller routes I/O addresses to.

mod access;
mod error;
mod peripheral;

pub use access::{AccessKind, AccessWidth, BusAccess, FlashOp, Permissions};
pub use error::{Error, Result};
pub use peripheral::{NullPeripherals, PeripheralBus};
