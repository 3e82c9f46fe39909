//! Instruction execution.
//!
//! Operand reads and writes are parameterized by addressing mode; the
//! side-effect ordering is architectural: source extension word before
//! destination extension word, auto-increment immediately after the memory
//! read it is tied to, flags after a successful destination write so a
//! faulting access leaves no partial writeback behind.

use emu430_core::{Error, Result};

use crate::addressing::AddrMode;
use crate::alu;
use crate::bus::Msp430Bus;
use crate::cpu::Msp430;
use crate::decode::{JUMP_OFFSET_MAX, JUMP_OFFSET_MIN};
use crate::flags::{C, N, V, Z};
use crate::instruction::{
    Condition, DoubleOperand, Instruction, Jump, OpcodeI, OpcodeII, SingleOperand,
};
use crate::registers::SR;
use crate::timing;

/// Where a destination operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Reg(u8),
    Mem(u16),
}

/// Flag results of an operation, applied to SR after writeback.
///
/// `v: None` leaves V untouched (DADD leaves it undefined; we preserve it).
#[derive(Debug, Clone, Copy)]
struct FlagUpdate {
    c: bool,
    z: bool,
    n: bool,
    v: Option<bool>,
}

impl FlagUpdate {
    /// The common case: Z/N from the result, C and V supplied.
    fn arith(value: u16, byte_op: bool, c: bool, v: bool) -> Self {
        Self {
            c,
            z: alu::is_zero(value, byte_op),
            n: alu::is_negative(value, byte_op),
            v: Some(v),
        }
    }

    /// Logic-op rule: C set iff the result is non-zero, V cleared.
    fn logic(value: u16, byte_op: bool) -> Self {
        Self::arith(value, byte_op, !alu::is_zero(value, byte_op), false)
    }
}

impl Msp430 {
    /// Execute an already-decoded instruction and return its cycle count.
    ///
    /// `step` fetches, decodes, and lands here; callers holding their own
    /// instruction records (debuggers, tests) may invoke it directly.
    pub fn execute<B: Msp430Bus>(&mut self, instr: &Instruction, bus: &mut B) -> Result<u64> {
        match instr {
            Instruction::FormatI(op) => self.exec_double(op, bus),
            Instruction::FormatII(op) => self.exec_single(op, bus),
            Instruction::FormatIII(op) => self.exec_jump(op),
        }
    }

    // === Operand plumbing ===

    /// Fetch an extension word from the instruction stream. Returns the word
    /// and the address it was fetched from (the base for symbolic operands).
    fn fetch_ext<B: Msp430Bus>(&mut self, bus: &mut B) -> Result<(u16, u16)> {
        let at = self.regs.pc();
        let ext = bus.fetch_word(at)?;
        self.regs.advance_pc(2);
        Ok((ext, at))
    }

    /// Read a source operand, consuming its extension word if it has one.
    fn read_source<B: Msp430Bus>(
        &mut self,
        reg: u8,
        mode: AddrMode,
        byte_op: bool,
        bus: &mut B,
    ) -> Result<u16> {
        let m = alu::mask(byte_op);
        match mode {
            AddrMode::Register => Ok(self.regs.read(reg) & m),
            AddrMode::Constant(k) => Ok((k as i16 as u16) & m),
            AddrMode::Immediate => {
                let (ext, _) = self.fetch_ext(bus)?;
                Ok(ext & m)
            }
            AddrMode::Indirect => {
                let addr = self.regs.read(reg);
                self.read_mem(addr, byte_op, bus)
            }
            AddrMode::IndirectAutoInc => {
                let addr = self.regs.read(reg);
                let value = self.read_mem(addr, byte_op, bus)?;
                let inc = if byte_op { 1 } else { 2 };
                self.regs.write(reg, addr.wrapping_add(inc));
                Ok(value)
            }
            AddrMode::Indexed => {
                let (ext, _) = self.fetch_ext(bus)?;
                let addr = self.regs.read(reg).wrapping_add(ext);
                self.read_mem(addr, byte_op, bus)
            }
            AddrMode::Absolute => {
                let (ext, _) = self.fetch_ext(bus)?;
                self.read_mem(ext, byte_op, bus)
            }
            AddrMode::Symbolic => {
                let (ext, at) = self.fetch_ext(bus)?;
                self.read_mem(at.wrapping_add(ext), byte_op, bus)
            }
        }
    }

    /// Resolve a destination operand to a location, consuming its extension
    /// word if it has one. Auto-increment destinations (legacy, not
    /// encodable) apply their side effect here.
    fn resolve_destination<B: Msp430Bus>(
        &mut self,
        reg: u8,
        mode: AddrMode,
        byte_op: bool,
        word: u16,
        bus: &mut B,
    ) -> Result<Location> {
        match mode {
            AddrMode::Register => Ok(Location::Reg(reg)),
            AddrMode::Indexed => {
                let (ext, _) = self.fetch_ext(bus)?;
                Ok(Location::Mem(self.regs.read(reg).wrapping_add(ext)))
            }
            AddrMode::Absolute => {
                let (ext, _) = self.fetch_ext(bus)?;
                Ok(Location::Mem(ext))
            }
            AddrMode::Symbolic => {
                let (ext, at) = self.fetch_ext(bus)?;
                Ok(Location::Mem(at.wrapping_add(ext)))
            }
            AddrMode::Indirect => Ok(Location::Mem(self.regs.read(reg))),
            AddrMode::IndirectAutoInc => {
                let addr = self.regs.read(reg);
                let inc = if byte_op { 1 } else { 2 };
                self.regs.write(reg, addr.wrapping_add(inc));
                Ok(Location::Mem(addr))
            }
            AddrMode::Immediate | AddrMode::Constant(_) => Err(Error::InvalidInstruction { word }),
        }
    }

    fn read_mem<B: Msp430Bus>(&mut self, addr: u16, byte_op: bool, bus: &mut B) -> Result<u16> {
        if byte_op {
            Ok(u16::from(bus.read_byte(addr)?))
        } else {
            bus.read_word(addr)
        }
    }

    fn read_location<B: Msp430Bus>(
        &mut self,
        loc: Location,
        byte_op: bool,
        bus: &mut B,
    ) -> Result<u16> {
        match loc {
            Location::Reg(reg) => Ok(self.regs.read(reg) & alu::mask(byte_op)),
            Location::Mem(addr) => self.read_mem(addr, byte_op, bus),
        }
    }

    fn write_location<B: Msp430Bus>(
        &mut self,
        loc: Location,
        value: u16,
        byte_op: bool,
        bus: &mut B,
    ) -> Result<()> {
        match loc {
            Location::Reg(reg) => {
                if byte_op {
                    self.regs.write_byte(reg, value as u8);
                } else {
                    self.regs.write(reg, value);
                }
                Ok(())
            }
            Location::Mem(addr) => {
                if byte_op {
                    bus.write_byte(addr, value as u8)
                } else {
                    bus.write_word(addr, value)
                }
            }
        }
    }

    /// Merge an operation's flag results into the live SR.
    ///
    /// Applied after the destination write, so a write that targeted R2
    /// keeps its non-flag bits and a faulted write never half-updates SR.
    fn apply_flags(&mut self, flags: FlagUpdate) {
        let mut sr = self.regs.status();
        sr.assign(C, flags.c);
        sr.assign(Z, flags.z);
        sr.assign(N, flags.n);
        if let Some(v) = flags.v {
            sr.assign(V, v);
        }
        self.regs.set_status(sr);
    }

    // === Format I ===

    fn exec_double<B: Msp430Bus>(&mut self, op: &DoubleOperand, bus: &mut B) -> Result<u64> {
        let byte_op = op.byte_op;
        let src = self.read_source(op.src_reg, op.src_mode, byte_op, bus)?;
        let dst_loc = self.resolve_destination(op.dst_reg, op.dst_mode, byte_op, op.word, bus)?;
        let sr = self.regs.status();

        // (result to write if any, flags to apply if any)
        let (result, flags) = match op.opcode {
            OpcodeI::Mov => (Some(src), None),
            OpcodeI::Add | OpcodeI::Addc => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                let carry_in = op.opcode == OpcodeI::Addc && sr.is_set(C);
                let r = alu::add(src, dst, carry_in, byte_op);
                (
                    Some(r.value),
                    Some(FlagUpdate::arith(r.value, byte_op, r.carry, r.overflow)),
                )
            }
            OpcodeI::Sub | OpcodeI::Subc | OpcodeI::Cmp => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                let carry_in = if op.opcode == OpcodeI::Subc {
                    sr.is_set(C)
                } else {
                    true
                };
                let r = alu::sub(src, dst, carry_in, byte_op);
                let value = (op.opcode != OpcodeI::Cmp).then_some(r.value);
                (
                    value,
                    Some(FlagUpdate::arith(r.value, byte_op, r.carry, r.overflow)),
                )
            }
            OpcodeI::Dadd => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                let (value, carry) = alu::dadd(src, dst, sr.is_set(C), byte_op);
                let flags = FlagUpdate {
                    c: carry,
                    z: alu::is_zero(value, byte_op),
                    n: alu::is_negative(value, byte_op),
                    v: None,
                };
                (Some(value), Some(flags))
            }
            OpcodeI::Bit => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                (None, Some(FlagUpdate::logic(src & dst, byte_op)))
            }
            OpcodeI::Bic => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                (Some(dst & !src), None)
            }
            OpcodeI::Bis => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                (Some(dst | src), None)
            }
            OpcodeI::Xor => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                let value = (src ^ dst) & alu::mask(byte_op);
                let mut flags = FlagUpdate::logic(value, byte_op);
                // XOR overflows when both operands are negative.
                flags.v = Some(
                    alu::is_negative(src, byte_op) && alu::is_negative(dst, byte_op),
                );
                (Some(value), Some(flags))
            }
            OpcodeI::And => {
                let dst = self.read_location(dst_loc, byte_op, bus)?;
                (Some(src & dst), Some(FlagUpdate::logic(src & dst, byte_op)))
            }
        };

        if let Some(value) = result {
            self.write_location(dst_loc, value, byte_op, bus)?;
        }
        if let Some(flags) = flags {
            self.apply_flags(flags);
        }

        Ok(timing::format_i(op))
    }

    // === Format II ===

    fn exec_single<B: Msp430Bus>(&mut self, op: &SingleOperand, bus: &mut B) -> Result<u64> {
        let byte_op = op.byte_op;
        match op.opcode {
            OpcodeII::Rrc | OpcodeII::Rra | OpcodeII::Swpb | OpcodeII::Sxt => {
                // Read-modify-write in place. The auto-increment variant
                // defers its register update until the read has succeeded.
                let loc = if op.mode == AddrMode::IndirectAutoInc {
                    Location::Mem(self.regs.read(op.reg))
                } else {
                    self.resolve_destination(op.reg, op.mode, byte_op, op.word, bus)?
                };
                let value = self.read_location(loc, byte_op, bus)?;
                if op.mode == AddrMode::IndirectAutoInc {
                    let inc = if byte_op { 1 } else { 2 };
                    let reg = self.regs.read(op.reg).wrapping_add(inc);
                    self.regs.write(op.reg, reg);
                }
                let (result, flags) = match op.opcode {
                    OpcodeII::Rrc => {
                        let (v, carry) = alu::rrc(value, self.regs.status().is_set(C), byte_op);
                        (v, Some(FlagUpdate::arith(v, byte_op, carry, false)))
                    }
                    OpcodeII::Rra => {
                        let (v, carry) = alu::rra(value, byte_op);
                        (v, Some(FlagUpdate::arith(v, byte_op, carry, false)))
                    }
                    OpcodeII::Swpb => (alu::swpb(value), None),
                    _ => {
                        let v = alu::sxt(value);
                        (v, Some(FlagUpdate::arith(v, false, v != 0, false)))
                    }
                };
                self.write_location(loc, result, byte_op, bus)?;
                if let Some(flags) = flags {
                    self.apply_flags(flags);
                }
            }
            OpcodeII::Push => {
                let value = self.read_source(op.reg, op.mode, byte_op, bus)?;
                let slot = self.stack_slot()?;
                if byte_op {
                    bus.write_byte(slot, value as u8)?;
                } else {
                    bus.write_word(slot, value)?;
                }
                self.regs.set_sp(slot);
            }
            OpcodeII::Call => {
                let target = self.read_source(op.reg, op.mode, false, bus)?;
                let slot = self.stack_slot()?;
                bus.write_word(slot, self.regs.pc())?;
                self.regs.set_sp(slot);
                self.regs.set_pc(target);
            }
            OpcodeII::Reti => {
                let sp = self.regs.sp();
                if u32::from(sp) + 3 > 0xFFFF {
                    return Err(Error::StackFault { address: sp });
                }
                let sr = bus.read_word(sp)?;
                let pc = bus.read_word(sp.wrapping_add(2))?;
                self.regs.write(SR, sr);
                self.regs.set_pc(pc);
                self.regs.set_sp(sp.wrapping_add(4));
            }
        }
        Ok(timing::format_ii(op))
    }

    /// The slot a push would occupy. SP itself moves only after the stack
    /// write succeeds.
    fn stack_slot(&self) -> Result<u16> {
        let sp = self.regs.sp();
        sp.checked_sub(2).ok_or(Error::StackFault { address: sp })
    }

    // === Format III ===

    fn exec_jump(&mut self, op: &Jump) -> Result<u64> {
        // Decoded offsets are already in range; hand-built records may not be.
        if op.offset < JUMP_OFFSET_MIN || op.offset > JUMP_OFFSET_MAX {
            return Err(Error::JumpRange { offset: op.offset });
        }
        if self.condition_met(op.condition) {
            let delta = (op.offset * 2) as u16;
            self.regs.set_pc(self.regs.pc().wrapping_add(delta));
        }
        Ok(timing::format_iii())
    }

    fn condition_met(&self, condition: Condition) -> bool {
        let sr = self.regs.status();
        match condition {
            Condition::Jne => !sr.is_set(Z),
            Condition::Jeq => sr.is_set(Z),
            Condition::Jnc => !sr.is_set(C),
            Condition::Jc => sr.is_set(C),
            Condition::Jn => sr.is_set(N),
            Condition::Jge => sr.is_set(N) == sr.is_set(V),
            Condition::Jl => sr.is_set(N) != sr.is_set(V),
            Condition::Jmp => true,
        }
    }
}
