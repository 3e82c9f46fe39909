//! The memory controller.
//!
//! Single façade over every backing store and the peripheral bus. Each
//! operation runs the same pipeline: alignment check, map/permission
//! validation, region-specific cycle cost, dispatch, statistics, access
//! event. Any failure counts as a violation, fires the violation event, and
//! propagates unchanged; no partial write is left behind.

use cpu_msp430::Msp430Bus;
use emu430_core::{
    AccessKind, AccessWidth, BusAccess, Error, FlashOp, NullPeripherals, PeripheralBus, Result,
};
use log::error;

use crate::events::AccessObserver;
use crate::fram::{FramConfig, FramMemory};
use crate::info::InformationMemory;
use crate::map::{MemoryMap, MemoryRegion, RegionKind};
use crate::ram::RandomAccessMemory;
use crate::stats::MemoryStats;
use crate::validator::AccessValidator;

/// Cycle cost of an information-memory or FRAM write.
const FRAM_WRITE_CYCLES: u64 = 30;

/// Arbitrates all memory traffic for the FR2355.
pub struct MemoryController<P: PeripheralBus = NullPeripherals> {
    validator: AccessValidator,
    sram: RandomAccessMemory,
    bootloader: RandomAccessMemory,
    vectors: RandomAccessMemory,
    fram: FramMemory,
    info: InformationMemory,
    peripherals: P,
    observer: Option<Box<dyn AccessObserver>>,
    stats: MemoryStats,
}

impl MemoryController<NullPeripherals> {
    /// Controller with the FR2355 map and no peripherals attached.
    #[must_use]
    pub fn new() -> Self {
        Self::with_peripherals(NullPeripherals)
    }
}

impl Default for MemoryController<NullPeripherals> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PeripheralBus> MemoryController<P> {
    /// Controller with the FR2355 map and the given peripheral bus.
    #[must_use]
    pub fn with_peripherals(peripherals: P) -> Self {
        Self::with_map_and_peripherals(MemoryMap::fr2355(), peripherals)
    }

    /// Controller over a caller-supplied (already validated) region map.
    #[must_use]
    pub fn with_map_and_peripherals(map: MemoryMap, peripherals: P) -> Self {
        Self {
            validator: AccessValidator::new(map),
            sram: RandomAccessMemory::new("SRAM", 0x2000, 0x1000, 0x00),
            bootloader: RandomAccessMemory::new("bootstrap loader", 0x1000, 0x0800, 0xFF),
            vectors: RandomAccessMemory::new("interrupt vectors", 0xFFE0, 0x0020, 0xFF),
            fram: FramMemory::new("FRAM", 0x4000, 0x8000),
            info: InformationMemory::new(),
            peripherals,
            observer: None,
            stats: MemoryStats::default(),
        }
    }

    /// Replace the FRAM store with one using the given behavior switches.
    /// Intended for configuration time; contents return to the erased state.
    pub fn set_fram_config(&mut self, config: FramConfig) {
        self.fram = FramMemory::with_config("FRAM", 0x4000, 0x8000, config);
    }

    /// Attach an access/violation observer.
    pub fn set_observer(&mut self, observer: Box<dyn AccessObserver>) {
        self.observer = Some(observer);
    }

    // === Public operations ===

    pub fn read_byte(&mut self, addr: u16) -> Result<u8> {
        let access = BusAccess::new(addr, AccessKind::Read, AccessWidth::Byte);
        self.run(access, None).map(|v| v as u8)
    }

    pub fn read_word(&mut self, addr: u16) -> Result<u16> {
        let access = BusAccess::new(addr, AccessKind::Read, AccessWidth::Word);
        self.run(access, None)
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) -> Result<()> {
        let access = BusAccess::new(addr, AccessKind::Write, AccessWidth::Byte);
        self.run(access, Some(u16::from(value))).map(|_| ())
    }

    pub fn write_word(&mut self, addr: u16, value: u16) -> Result<()> {
        let access = BusAccess::new(addr, AccessKind::Write, AccessWidth::Word);
        self.run(access, Some(value)).map(|_| ())
    }

    /// Fetch an instruction or extension word.
    pub fn fetch_word(&mut self, addr: u16) -> Result<u16> {
        let access = BusAccess::new(addr, AccessKind::Execute, AccessWidth::Word);
        self.run(access, None)
    }

    /// Forward elapsed cycles to the flash controller.
    pub fn tick(&mut self, cycles: u64) {
        self.fram.update(cycles);
    }

    /// Restore the erased power-on state: SRAM zeroed, FRAM and information
    /// memory erased (protected segments and permanent protection respected),
    /// statistics zeroed, flash controller locked. The bootstrap loader and
    /// vector table keep their loaded contents.
    pub fn reset(&mut self) {
        self.sram.fill(0x00);
        self.fram.reset();
        self.info.reset();
        self.stats.reset();
    }

    // === Accessors ===

    #[must_use]
    pub const fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    #[must_use]
    pub fn map(&self) -> &MemoryMap {
        self.validator.map()
    }

    #[must_use]
    pub const fn fram(&self) -> &FramMemory {
        &self.fram
    }

    pub const fn fram_mut(&mut self) -> &mut FramMemory {
        &mut self.fram
    }

    #[must_use]
    pub const fn info(&self) -> &InformationMemory {
        &self.info
    }

    pub const fn info_mut(&mut self) -> &mut InformationMemory {
        &mut self.info
    }

    pub const fn peripherals_mut(&mut self) -> &mut P {
        &mut self.peripherals
    }

    /// Read without side effects: no statistics, no events, no permission
    /// check. `None` for peripheral or unmapped addresses.
    #[must_use]
    pub fn peek_byte(&self, addr: u16) -> Option<u8> {
        match self.validator.map().lookup(addr)?.kind {
            RegionKind::Sram => self.sram.peek(addr),
            RegionKind::Bootloader => self.bootloader.peek(addr),
            RegionKind::VectorTable => self.vectors.peek(addr),
            RegionKind::Fram => self.fram.peek(addr),
            RegionKind::Info => self.info.peek(addr),
            RegionKind::Sfr | RegionKind::Periph8 | RegionKind::Periph16 => None,
        }
    }

    /// Word variant of [`Self::peek_byte`].
    #[must_use]
    pub fn peek_word(&self, addr: u16) -> Option<u16> {
        let lo = self.peek_byte(addr)?;
        let hi = self.peek_byte(addr.wrapping_add(1))?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Copy raw bytes into the stores behind an address range, bypassing
    /// validation and statistics. Image loaders use this; peripheral
    /// regions are not loadable.
    pub fn load_image(&mut self, addr: u16, bytes: &[u8]) -> Result<()> {
        let mut at = addr;
        let mut remaining = bytes;
        while !remaining.is_empty() {
            let Some(region) = self.validator.map().lookup(at) else {
                return Err(Error::MemoryAccess {
                    address: at,
                    kind: AccessKind::Write,
                    permissions: None,
                });
            };
            // Clip the chunk to the current region.
            let span = (usize::from(region.end - at) + 1).min(remaining.len());
            let (chunk, rest) = remaining.split_at(span);
            match region.kind {
                RegionKind::Sram => self.sram.load(at, chunk)?,
                RegionKind::Bootloader => self.bootloader.load(at, chunk)?,
                RegionKind::VectorTable => self.vectors.load(at, chunk)?,
                RegionKind::Fram => self.fram.load(at, chunk)?,
                RegionKind::Info => self.info.load(at, chunk)?,
                RegionKind::Sfr | RegionKind::Periph8 | RegionKind::Periph16 => {
                    return Err(Error::MemoryAccess {
                        address: at,
                        kind: AccessKind::Write,
                        permissions: Some(region.perms),
                    });
                }
            }
            remaining = rest;
            at = at.wrapping_add(span as u16);
        }
        Ok(())
    }

    // === The access pipeline ===

    /// Run one access end to end. Returns the value read (or echoed back
    /// for writes).
    fn run(&mut self, access: BusAccess, value: Option<u16>) -> Result<u16> {
        match self.dispatch(access, value) {
            Ok((data, region, cycles)) => {
                match access.kind {
                    AccessKind::Read => self.stats.reads += 1,
                    AccessKind::Write => self.stats.writes += 1,
                    AccessKind::Execute => self.stats.instruction_fetches += 1,
                }
                self.stats.access_cycles += cycles;
                if let Some(observer) = self.observer.as_deref_mut() {
                    let reported = match access.kind {
                        AccessKind::Write => None,
                        AccessKind::Read | AccessKind::Execute => Some(data),
                    };
                    observer.on_access(&access, &region, cycles, reported);
                }
                Ok(data)
            }
            Err(err) => {
                error!("{access} failed: {err}");
                self.stats.violations += 1;
                if let Some(observer) = self.observer.as_deref_mut() {
                    observer.on_violation(&access, &err);
                }
                Err(err)
            }
        }
    }

    /// Validate and dispatch, returning (data, region, cycle cost).
    fn dispatch(
        &mut self,
        access: BusAccess,
        value: Option<u16>,
    ) -> Result<(u16, MemoryRegion, u64)> {
        if access.misaligned() {
            return Err(Error::MemoryAlignment {
                address: access.address,
            });
        }
        let region = *self.validator.validate(access)?;
        let cycles = cycle_cost(region.kind, access.kind);
        let addr = access.address;

        let data = match (access.kind, region.kind) {
            // Peripheral space
            (AccessKind::Read | AccessKind::Execute, RegionKind::Sfr | RegionKind::Periph8 | RegionKind::Periph16) => {
                match access.width {
                    AccessWidth::Byte => u16::from(self.peripherals.read_byte(addr)),
                    AccessWidth::Word => self.peripherals.read_word(addr),
                }
            }
            (AccessKind::Write, RegionKind::Sfr | RegionKind::Periph8 | RegionKind::Periph16) => {
                let v = value.unwrap_or(0);
                let accepted = match access.width {
                    AccessWidth::Byte => self.peripherals.write_byte(addr, v as u8),
                    AccessWidth::Word => self.peripherals.write_word(addr, v),
                };
                if !accepted {
                    return Err(Error::MemoryAccess {
                        address: addr,
                        kind: AccessKind::Write,
                        permissions: Some(region.perms),
                    });
                }
                v
            }

            // SRAM
            (AccessKind::Read | AccessKind::Execute, RegionKind::Sram) => match access.width {
                AccessWidth::Byte => u16::from(self.sram.read_byte(addr)?),
                AccessWidth::Word => self.sram.read_word(addr)?,
            },
            (AccessKind::Write, RegionKind::Sram) => {
                let v = value.unwrap_or(0);
                match access.width {
                    AccessWidth::Byte => self.sram.write_byte(addr, v as u8)?,
                    AccessWidth::Word => self.sram.write_word(addr, v)?,
                }
                v
            }

            // Bootstrap loader and vector table (writes blocked by perms)
            (_, RegionKind::Bootloader) => match access.width {
                AccessWidth::Byte => u16::from(self.bootloader.read_byte(addr)?),
                AccessWidth::Word => self.bootloader.read_word(addr)?,
            },
            (_, RegionKind::VectorTable) => match access.width {
                AccessWidth::Byte => u16::from(self.vectors.read_byte(addr)?),
                AccessWidth::Word => self.vectors.read_word(addr)?,
            },

            // Code/data FRAM
            (AccessKind::Read | AccessKind::Execute, RegionKind::Fram) => match access.width {
                AccessWidth::Byte => u16::from(self.fram.read_byte(addr)?),
                AccessWidth::Word => self.fram.read_word(addr)?,
            },
            (AccessKind::Write, RegionKind::Fram) => {
                let v = value.unwrap_or(0);
                match access.width {
                    AccessWidth::Byte => self.fram.program_byte(addr, v as u8)?,
                    AccessWidth::Word => self.fram.program_word(addr, v)?,
                }
                v
            }

            // Information memory
            (AccessKind::Read | AccessKind::Execute, RegionKind::Info) => match access.width {
                AccessWidth::Byte => u16::from(self.info.read_byte(addr)?),
                AccessWidth::Word => self.info.read_word(addr)?,
            },
            (AccessKind::Write, RegionKind::Info) => {
                let v = value.unwrap_or(0);
                let written = match access.width {
                    AccessWidth::Byte => self.info.write_byte(addr, v as u8)?,
                    AccessWidth::Word => self.info.write_word(addr, v)?,
                };
                if !written {
                    return Err(Error::FlashProtection {
                        address: addr,
                        operation: FlashOp::Program,
                    });
                }
                v
            }
        };

        Ok((data, region, cycles))
    }
}

/// Cycle cost per region and access kind.
const fn cycle_cost(region: RegionKind, kind: AccessKind) -> u64 {
    match (region, kind) {
        (RegionKind::Fram | RegionKind::Info, AccessKind::Write) => FRAM_WRITE_CYCLES,
        _ => 1,
    }
}

impl<P: PeripheralBus> Msp430Bus for MemoryController<P> {
    fn read_byte(&mut self, addr: u16) -> Result<u8> {
        MemoryController::read_byte(self, addr)
    }

    fn read_word(&mut self, addr: u16) -> Result<u16> {
        MemoryController::read_word(self, addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<()> {
        MemoryController::write_byte(self, addr, value)
    }

    fn write_word(&mut self, addr: u16, value: u16) -> Result<()> {
        MemoryController::write_word(self, addr, value)
    }

    fn fetch_word(&mut self, addr: u16) -> Result<u16> {
        MemoryController::fetch_word(self, addr)
    }
}
