//! Instruction word decoding.
//!
//! Classification is a layered prefix test: jump format first (bits 15:13 =
//! 001), then single-operand (bits 15:10 = 000100), then double-operand
//! (opcode nibble 0x4..0xF). Anything else is a reserved encoding.
//!
//! The decoder never consults memory; its errors are pure and carry the raw
//! word.

use emu430_core::{Error, Result};

use crate::addressing::{self, AddrMode};
use crate::instruction::{
    Condition, DoubleOperand, Instruction, Jump, OpcodeI, OpcodeII, SingleOperand,
};

/// Jump offsets are limited to −511..=+512 words.
pub const JUMP_OFFSET_MIN: i16 = -511;
/// Jump offsets are limited to −511..=+512 words.
pub const JUMP_OFFSET_MAX: i16 = 512;

/// Decode one 16-bit instruction word.
pub fn decode(word: u16) -> Result<Instruction> {
    if word & 0xE000 == 0x2000 {
        decode_jump(word)
    } else if word & 0xFC00 == 0x1000 {
        decode_single_operand(word)
    } else if word >> 12 >= 0x4 {
        decode_double_operand(word)
    } else {
        Err(Error::InvalidInstruction { word })
    }
}

fn decode_jump(word: u16) -> Result<Instruction> {
    let condition = Condition::from_bits((word >> 10) as u8);
    let offset = sign_extend_10(word & 0x03FF);
    // Of the decodable offsets only −512 falls outside the valid range.
    if offset < JUMP_OFFSET_MIN || offset > JUMP_OFFSET_MAX {
        return Err(Error::JumpRange { offset });
    }
    Ok(Instruction::FormatIII(Jump {
        condition,
        offset,
        word,
    }))
}

fn decode_single_operand(word: u16) -> Result<Instruction> {
    let Some(opcode) = OpcodeII::from_bits(((word >> 7) & 0x7) as u8) else {
        return Err(Error::InvalidInstruction { word });
    };
    let byte_op = word & 0x0040 != 0;
    let as_bits = ((word >> 4) & 0x3) as u8;
    let reg = (word & 0xF) as u8;

    if opcode == OpcodeII::Reti {
        // RETI takes no operand; only the exact pattern is valid.
        if word != 0x1300 {
            return Err(Error::InvalidInstruction { word });
        }
        return Ok(Instruction::FormatII(SingleOperand {
            opcode,
            reg: 0,
            mode: AddrMode::Register,
            byte_op: false,
            word,
            ext_words: 0,
        }));
    }

    // SWPB, SXT and CALL have no byte form.
    if byte_op && matches!(opcode, OpcodeII::Swpb | OpcodeII::Sxt | OpcodeII::Call) {
        return Err(Error::InvalidInstruction { word });
    }

    let mode = addressing::source_mode(reg, as_bits, word)?;

    // The shift/byte-swap/sign-extend group rewrites its operand in place;
    // an immediate or synthesized constant has nowhere to land.
    if matches!(
        opcode,
        OpcodeII::Rrc | OpcodeII::Swpb | OpcodeII::Rra | OpcodeII::Sxt
    ) && matches!(mode, AddrMode::Immediate | AddrMode::Constant(_))
    {
        return Err(Error::InvalidInstruction { word });
    }

    Ok(Instruction::FormatII(SingleOperand {
        opcode,
        reg,
        mode,
        byte_op,
        word,
        ext_words: u8::from(mode.needs_extension_word()),
    }))
}

fn decode_double_operand(word: u16) -> Result<Instruction> {
    let Some(opcode) = OpcodeI::from_bits((word >> 12) as u8) else {
        return Err(Error::InvalidInstruction { word });
    };
    let src_reg = ((word >> 8) & 0xF) as u8;
    let ad_bit = ((word >> 7) & 0x1) as u8;
    let byte_op = word & 0x0040 != 0;
    let as_bits = ((word >> 4) & 0x3) as u8;
    let dst_reg = (word & 0xF) as u8;

    let src_mode = addressing::source_mode(src_reg, as_bits, word)?;
    let dst_mode = addressing::destination_mode(dst_reg, ad_bit, word)?;

    let ext_words =
        u8::from(src_mode.needs_extension_word()) + u8::from(dst_mode.needs_extension_word());

    Ok(Instruction::FormatI(DoubleOperand {
        opcode,
        src_reg,
        src_mode,
        dst_reg,
        dst_mode,
        byte_op,
        word,
        ext_words,
    }))
}

/// Sign-extend a 10-bit field to i16.
const fn sign_extend_10(bits: u16) -> i16 {
    if bits & 0x0200 != 0 {
        (bits | 0xFC00) as i16
    } else {
        bits as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{PC, SP};

    fn decode_i(word: u16) -> DoubleOperand {
        match decode(word).unwrap() {
            Instruction::FormatI(op) => op,
            other => panic!("expected Format I, got {other:?}"),
        }
    }

    fn decode_ii(word: u16) -> SingleOperand {
        match decode(word).unwrap() {
            Instruction::FormatII(op) => op,
            other => panic!("expected Format II, got {other:?}"),
        }
    }

    fn decode_iii(word: u16) -> Jump {
        match decode(word).unwrap() {
            Instruction::FormatIII(op) => op,
            other => panic!("expected Format III, got {other:?}"),
        }
    }

    #[test]
    fn mov_immediate_to_register() {
        // MOV #imm, R1 (imm in extension word)
        let op = decode_i(0x4031);
        assert_eq!(op.opcode, OpcodeI::Mov);
        assert_eq!(op.src_reg, PC);
        assert_eq!(op.src_mode, AddrMode::Immediate);
        assert_eq!(op.dst_reg, SP);
        assert_eq!(op.dst_mode, AddrMode::Register);
        assert!(!op.byte_op);
        assert_eq!(op.ext_words, 1);
    }

    #[test]
    fn add_register_to_register() {
        // ADD R5, R4
        let op = decode_i(0x5504);
        assert_eq!(op.opcode, OpcodeI::Add);
        assert_eq!(op.src_reg, 5);
        assert_eq!(op.dst_reg, 4);
        assert_eq!(op.src_mode, AddrMode::Register);
        assert_eq!(op.dst_mode, AddrMode::Register);
        assert_eq!(op.ext_words, 0);
    }

    #[test]
    fn mov_byte_form() {
        // MOV.B R5, R4
        let op = decode_i(0x4544);
        assert!(op.byte_op);
    }

    #[test]
    fn indexed_both_sides_takes_two_extension_words() {
        // MOV 2(R4), 4(R5): As=01, Ad=1
        let op = decode_i(0x4495);
        assert_eq!(op.src_mode, AddrMode::Indexed);
        assert_eq!(op.dst_mode, AddrMode::Indexed);
        assert_eq!(op.ext_words, 2);

        let instr = decode(0x4495).unwrap();
        assert_eq!(instr.word(), 0x4495);
        assert_eq!(instr.len_bytes(), 6);
    }

    #[test]
    fn constant_generator_consumes_no_extension_word() {
        // MOV #8, R5 (R2 As=11)
        let op = decode_i(0x4235);
        assert_eq!(op.src_mode, AddrMode::Constant(8));
        assert_eq!(op.ext_words, 0);

        // MOV #1, R5 (R3 As=01)
        let op = decode_i(0x4315);
        assert_eq!(op.src_mode, AddrMode::Constant(1));
        assert_eq!(op.ext_words, 0);

        // A general register with As=11 stays auto-increment
        let op = decode_i(0x4735);
        assert_eq!(op.src_mode, AddrMode::IndirectAutoInc);
    }

    #[test]
    fn push_and_call() {
        // PUSH R6
        let op = decode_ii(0x1206);
        assert_eq!(op.opcode, OpcodeII::Push);
        assert_eq!(op.reg, 6);
        assert_eq!(op.mode, AddrMode::Register);

        // CALL R5
        let op = decode_ii(0x1285);
        assert_eq!(op.opcode, OpcodeII::Call);
        assert_eq!(op.reg, 5);
    }

    #[test]
    fn rrc_swpb_rra_sxt_subdecode() {
        assert_eq!(decode_ii(0x1004).opcode, OpcodeII::Rrc);
        assert_eq!(decode_ii(0x1044).opcode, OpcodeII::Rrc); // RRC.B
        assert_eq!(decode_ii(0x1084).opcode, OpcodeII::Swpb);
        assert_eq!(decode_ii(0x1104).opcode, OpcodeII::Rra);
        assert_eq!(decode_ii(0x1184).opcode, OpcodeII::Sxt);
    }

    #[test]
    fn swpb_and_sxt_byte_forms_are_invalid() {
        assert!(matches!(
            decode(0x10C4),
            Err(Error::InvalidInstruction { word: 0x10C4 })
        ));
        assert!(matches!(decode(0x11C4), Err(Error::InvalidInstruction { .. })));
        // CALL.B
        assert!(matches!(decode(0x12C5), Err(Error::InvalidInstruction { .. })));
    }

    #[test]
    fn reti_is_exact() {
        assert_eq!(decode_ii(0x1300).opcode, OpcodeII::Reti);
        assert!(matches!(decode(0x1301), Err(Error::InvalidInstruction { .. })));
        assert!(matches!(decode(0x1340), Err(Error::InvalidInstruction { .. })));
    }

    #[test]
    fn sub_opcode_7_is_reserved() {
        assert!(matches!(decode(0x1380), Err(Error::InvalidInstruction { .. })));
    }

    #[test]
    fn rotate_of_immediate_is_invalid() {
        // RRA #4 (R2, As=10) has no writeback target
        assert!(matches!(decode(0x1122), Err(Error::InvalidInstruction { .. })));
        // RRC @PC+ (immediate)
        assert!(matches!(decode(0x1030), Err(Error::InvalidInstruction { .. })));
    }

    #[test]
    fn push_of_constant_is_valid() {
        // PUSH #2 via R3 As=10
        let op = decode_ii(0x1223);
        assert_eq!(op.opcode, OpcodeII::Push);
        assert_eq!(op.mode, AddrMode::Constant(2));
        assert_eq!(op.ext_words, 0);
    }

    #[test]
    fn jump_offsets_sign_extend() {
        // JMP .+0
        let jmp = decode_iii(0x3C00);
        assert_eq!(jmp.condition, Condition::Jmp);
        assert_eq!(jmp.offset, 0);

        // JMP .-2 (offset -1)
        assert_eq!(decode_iii(0x3FFF).offset, -1);

        // JMP +4
        assert_eq!(decode_iii(0x3C04).offset, 4);
    }

    #[test]
    fn jump_conditions_decode_in_isa_order() {
        assert_eq!(decode_iii(0x2000).condition, Condition::Jne);
        assert_eq!(decode_iii(0x2400).condition, Condition::Jeq);
        assert_eq!(decode_iii(0x2800).condition, Condition::Jnc);
        assert_eq!(decode_iii(0x2C00).condition, Condition::Jc);
        assert_eq!(decode_iii(0x3000).condition, Condition::Jn);
        assert_eq!(decode_iii(0x3400).condition, Condition::Jge);
        assert_eq!(decode_iii(0x3800).condition, Condition::Jl);
        assert_eq!(decode_iii(0x3C00).condition, Condition::Jmp);
    }

    #[test]
    fn jump_offset_minus_512_is_rejected() {
        // JMP with raw offset field 0x200 = -512 words
        assert!(matches!(
            decode(0x3E00),
            Err(Error::JumpRange { offset: -512 })
        ));
    }

    #[test]
    fn reserved_opcodes_fail() {
        assert!(matches!(decode(0x0000), Err(Error::InvalidInstruction { .. })));
        assert!(matches!(decode(0x0FFF), Err(Error::InvalidInstruction { .. })));
        assert!(matches!(decode(0x1400), Err(Error::InvalidInstruction { .. })));
        assert!(matches!(decode(0x1FFE), Err(Error::InvalidInstruction { .. })));
    }

    #[test]
    fn emulated_ret_decodes_as_mov() {
        // RET = MOV @SP+, PC
        let op = decode_i(0x4130);
        assert_eq!(op.opcode, OpcodeI::Mov);
        assert_eq!(op.src_reg, SP);
        assert_eq!(op.src_mode, AddrMode::IndirectAutoInc);
        assert_eq!(op.dst_reg, PC);
        assert_eq!(op.dst_mode, AddrMode::Register);
    }
}
