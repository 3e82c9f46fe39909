//! Instruction cycle counts per SLAU445I.
//!
//! Format I comes from Table 4-10, keyed by effective source mode,
//! destination mode, and whether the destination register is the PC.
//! MOV, BIT and CMP save one cycle when the destination is a memory mode.
//!
//! Destination Indirect/IndirectAutoInc is not encodable; records built by
//! hand with those destinations are costed with the legacy additive formula
//! instead of the table.

use crate::addressing::AddrMode;
use crate::instruction::{DoubleOperand, OpcodeI, OpcodeII, SingleOperand};
use crate::registers::PC;

/// Cycle count for a Format I instruction.
pub(crate) fn format_i(op: &DoubleOperand) -> u64 {
    let src = op.src_mode.for_cycle_lookup();
    let dst = op.dst_mode;
    let dst_is_pc = dst == AddrMode::Register && op.dst_reg == PC;

    let base = match (src, dst) {
        // Destination register (column split on PC)
        (AddrMode::Register, AddrMode::Register) => {
            if dst_is_pc {
                3
            } else {
                1
            }
        }
        (AddrMode::Indirect | AddrMode::IndirectAutoInc, AddrMode::Register) => {
            if dst_is_pc {
                4
            } else {
                2
            }
        }
        (AddrMode::Immediate, AddrMode::Register) => {
            if dst_is_pc {
                3
            } else {
                2
            }
        }
        (
            AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute,
            AddrMode::Register,
        ) => {
            if dst_is_pc {
                5
            } else {
                3
            }
        }

        // Destination memory
        (AddrMode::Register, AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute) => 4,
        (
            AddrMode::Indirect | AddrMode::IndirectAutoInc | AddrMode::Immediate,
            AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute,
        ) => 5,
        (
            AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute,
            AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute,
        ) => 6,

        // Not in Table 4-10: legacy additive formula.
        _ => return legacy_additive(src, dst),
    };

    let dst_memory = matches!(
        dst,
        AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute
    );
    if dst_memory && matches!(op.opcode, OpcodeI::Mov | OpcodeI::Bit | OpcodeI::Cmp) {
        (base - 1).max(1)
    } else {
        base
    }
}

/// `base(1) + src_surcharge + dst_surcharge` for combinations outside the
/// table.
fn legacy_additive(src: AddrMode, dst: AddrMode) -> u64 {
    let src_cost = match src {
        AddrMode::Register | AddrMode::Constant(_) => 0,
        AddrMode::Indirect | AddrMode::IndirectAutoInc | AddrMode::Immediate => 1,
        AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute => 2,
    };
    let dst_cost = match dst {
        AddrMode::Register | AddrMode::Constant(_) | AddrMode::Immediate => 0,
        AddrMode::Indirect | AddrMode::IndirectAutoInc => 2,
        AddrMode::Indexed | AddrMode::Symbolic | AddrMode::Absolute => 3,
    };
    1 + src_cost + dst_cost
}

/// Cycle count for a Format II instruction.
pub(crate) fn format_ii(op: &SingleOperand) -> u64 {
    if op.opcode == OpcodeII::Reti {
        return 5;
    }
    match op.mode {
        AddrMode::Register | AddrMode::Constant(_) => 1,
        AddrMode::Indirect | AddrMode::IndirectAutoInc => 3,
        AddrMode::Indexed | AddrMode::Absolute | AddrMode::Symbolic | AddrMode::Immediate => 4,
    }
}

/// Cycle count for any Format III jump, taken or not.
pub(crate) const fn format_iii() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::instruction::Instruction;

    fn cycles_i(word: u16) -> u64 {
        match decode(word).unwrap() {
            Instruction::FormatI(op) => format_i(&op),
            other => panic!("expected Format I, got {other:?}"),
        }
    }

    fn cycles_ii(word: u16) -> u64 {
        match decode(word).unwrap() {
            Instruction::FormatII(op) => format_ii(&op),
            other => panic!("expected Format II, got {other:?}"),
        }
    }

    #[test]
    fn register_to_register_is_one_cycle() {
        assert_eq!(cycles_i(0x5504), 1); // ADD R5, R4
    }

    #[test]
    fn immediate_to_register_is_two_cycles() {
        assert_eq!(cycles_i(0x4031), 2); // MOV #imm, SP
    }

    #[test]
    fn register_to_pc_is_three_cycles() {
        assert_eq!(cycles_i(0x4500), 3); // BR R5 = MOV R5, PC
    }

    #[test]
    fn indirect_autoinc_to_pc_is_four_cycles() {
        assert_eq!(cycles_i(0x4130), 4); // RET = MOV @SP+, PC
    }

    #[test]
    fn immediate_to_pc_is_three_cycles() {
        assert_eq!(cycles_i(0x4030), 3); // BR #imm = MOV #imm, PC
    }

    #[test]
    fn mov_saves_a_cycle_into_memory_destinations() {
        // MOV R5, 2(R4): table 4, MOV reduction -> 3
        assert_eq!(cycles_i(0x4584), 3);
        // ADD R5, 2(R4): no reduction
        assert_eq!(cycles_i(0x5584), 4);
        // CMP 2(R5), 4(R4): 6 - 1
        assert_eq!(cycles_i(0x9594), 5);
    }

    #[test]
    fn constant_generator_counts_as_register_source() {
        // MOV #8, R5 (R2 As=11)
        assert_eq!(cycles_i(0x4235), 1);
        // MOV #1, 2(R4) (R3 As=01): register row, memory column, MOV reduction
        assert_eq!(cycles_i(0x4394), 3);
    }

    #[test]
    fn indexed_to_indexed_is_six_cycles() {
        assert_eq!(cycles_i(0x5594), 6); // ADD 2(R5), 4(R4)
    }

    #[test]
    fn absolute_source_matches_indexed_row() {
        // ADD &EDE, R4: As=01 on R2
        assert_eq!(cycles_i(0x5214), 3);
    }

    #[test]
    fn format_ii_by_source_mode() {
        assert_eq!(cycles_ii(0x1204), 1); // PUSH R4
        assert_eq!(cycles_ii(0x1224), 3); // PUSH @R4
        assert_eq!(cycles_ii(0x1234), 3); // PUSH @R4+
        assert_eq!(cycles_ii(0x1214), 4); // PUSH 2(R4)
        assert_eq!(cycles_ii(0x1230), 4); // PUSH #imm
        assert_eq!(cycles_ii(0x1285), 1); // CALL R5
        assert_eq!(cycles_ii(0x1300), 5); // RETI
        assert_eq!(cycles_ii(0x1223), 1); // PUSH #2 (constant generator)
    }

    #[test]
    fn jumps_are_two_cycles() {
        assert_eq!(format_iii(), 2);
    }

    #[test]
    fn legacy_formula_for_non_encodable_destination() {
        let op = DoubleOperand {
            opcode: OpcodeI::Add,
            src_reg: 5,
            src_mode: AddrMode::Register,
            dst_reg: 4,
            dst_mode: AddrMode::Indirect,
            byte_op: false,
            word: 0,
            ext_words: 0,
        };
        assert_eq!(format_i(&op), 3); // 1 + 0 + 2

        let op = DoubleOperand {
            src_mode: AddrMode::IndirectAutoInc,
            ..op
        };
        assert_eq!(format_i(&op), 4); // 1 + 1 + 2
    }
}
