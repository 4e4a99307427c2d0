//! Instruction decoding.
//!
//! Decoding is a pure function from a 16-bit word to an [`Op`]. Operand
//! fields are extracted by masking, so register indices are always in
//! range `0x0..=0xF` by construction.
use std::fmt::{self, Formatter};

use crate::{bytecode::*, constants::Address};

/// A decoded instruction, along with where it was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    /// Address in memory where the instruction is located.
    pub addr: Address,
    /// The original instruction word.
    pub word: u16,
    pub op: Op,
}

impl Instr {
    /// Opcode class, the top nibble of the instruction word.
    #[inline(always)]
    pub fn class(&self) -> u8 {
        op_code(self.word)
    }

    #[inline(always)]
    pub fn x(&self) -> u8 {
        op_x(self.word)
    }

    #[inline(always)]
    pub fn y(&self) -> u8 {
        op_y(self.word)
    }

    #[inline(always)]
    pub fn n(&self) -> u8 {
        op_n(self.word)
    }

    #[inline(always)]
    pub fn kk(&self) -> u8 {
        op_kk(self.word)
    }

    #[inline(always)]
    pub fn nnn(&self) -> u16 {
        op_nnn(self.word)
    }

    /// Whether the op is an unrecognised bit pattern.
    pub fn is_unknown(&self) -> bool {
        matches!(self.op, Op::Unknown(_))
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "0x{:04X}  {:04X}  {}", self.addr, self.word, self.op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 0nnn (SYS addr)
    ///
    /// Jump to a machine code routine on the host computer.
    /// Ignored by modern interpreters.
    System { address: Address },
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xkk (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `kk`
    Skip_Eq_Byte { vx: u8, kk: u8 },
    /// 4xkk (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `kk`.
    Skip_NotEq_Byte { vx: u8, kk: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xkk (LD Vx, byte)
    Load_Byte { vx: u8, kk: u8 },
    /// 7xkk (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// The carry flag is not touched.
    Add_Byte { vx: u8, kk: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// ADDs VY to VX, and stores the result in VX.
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// Subtracts VY from VX, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VF is set to the least-significant bit of Vx, then Vx is shifted right by 1.
    /// VY is unused.
    ShiftRight { vx: u8, vy: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VF is set to the most-significant bit of Vx, then Vx is shifted left by 1.
    /// VY is unused.
    ShiftLeft { vx: u8, vy: u8 },

    /// 9xy0 (SNE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` does not equal register `Vy`.
    Skip_NotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to address `nnn` offset by `V0`.
    Jump_V0 { address: Address },
    /// Cxkk (RND Vx, byte)
    Random { vx: u8, kk: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw `n` rows of sprite data from `I` at the coordinates in `Vx` and `Vy`.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Miscellaneous
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Stall until a key is pressed, then store its value in `Vx`.
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_I_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Point `I` at the font glyph for the digit in `Vx`.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    ///
    /// Store the binary-coded decimal digits of `Vx` at `I`, `I+1` and `I+2`.
    Load_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },

    /// Bit pattern that does not map to any instruction in its class.
    Unknown(u16),
}

impl Op {
    /// Decode an instruction word.
    ///
    /// The all-zero word is not an instruction and decodes to `None`.
    /// It is what the machine finds when it walks into unwritten memory.
    pub fn decode(word: u16) -> Option<Op> {
        if word == 0 {
            return None;
        }

        let vx = op_x(word);
        let vy = op_y(word);
        let n = op_n(word);
        let kk = op_kk(word);
        let address = op_nnn(word);

        let op = match op_code(word) {
            0x0 => match word {
                0x00E0 => Op::ClearScreen,
                0x00EE => Op::Return,
                _ => Op::System { address },
            },
            0x1 => Op::JumpAddress { address },
            0x2 => Op::Call { address },
            0x3 => Op::Skip_Eq_Byte { vx, kk },
            0x4 => Op::Skip_NotEq_Byte { vx, kk },
            0x5 if n == 0 => Op::Skip_Eq { vx, vy },
            0x6 => Op::Load_Byte { vx, kk },
            0x7 => Op::Add_Byte { vx, kk },
            0x8 => match n {
                0x0 => Op::Load_Vx_Vy { vx, vy },
                0x1 => Op::Or_Vx_Vy { vx, vy },
                0x2 => Op::And_Vx_Vy { vx, vy },
                0x3 => Op::Xor_Vx_Vy { vx, vy },
                0x4 => Op::Add_Vx_Vy { vx, vy },
                0x5 => Op::Sub_Vx_Vy { vx, vy },
                0x6 => Op::ShiftRight { vx, vy },
                0x7 => Op::SubReverse_Vx_Vy { vx, vy },
                0xE => Op::ShiftLeft { vx, vy },
                _ => Op::Unknown(word),
            },
            0x9 if n == 0 => Op::Skip_NotEq { vx, vy },
            0xA => Op::Load_Address { address },
            0xB => Op::Jump_V0 { address },
            0xC => Op::Random { vx, kk },
            0xD => Op::Draw { vx, vy, n },
            0xE => match kk {
                0x9E => Op::Skip_Key { vx },
                0xA1 => Op::Skip_NotKey { vx },
                _ => Op::Unknown(word),
            },
            0xF => match kk {
                0x07 => Op::Load_Vx_Delay { vx },
                0x0A => Op::Load_Vx_Key { vx },
                0x15 => Op::Load_Delay_Vx { vx },
                0x18 => Op::Load_Sound_Vx { vx },
                0x1E => Op::Add_I_Vx { vx },
                0x29 => Op::Load_Font { vx },
                0x33 => Op::Load_Bcd { vx },
                0x55 => Op::Store_Registers { vx },
                0x65 => Op::Load_Registers { vx },
                _ => Op::Unknown(word),
            },
            // 5xyN and 9xyN with a non-zero last nibble.
            _ => Op::Unknown(word),
        };

        Some(op)
    }
}

/// Conventional assembly mnemonics.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Op::System { address } => write!(f, "SYS 0x{address:03X}"),
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, kk } => write!(f, "SE V{vx:X}, 0x{kk:02X}"),
            Op::Skip_NotEq_Byte { vx, kk } => write!(f, "SNE V{vx:X}, 0x{kk:02X}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE V{vx:X}, V{vy:X}"),
            Op::Load_Byte { vx, kk } => write!(f, "LD V{vx:X}, 0x{kk:02X}"),
            Op::Add_Byte { vx, kk } => write!(f, "ADD V{vx:X}, 0x{kk:02X}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD V{vx:X}, V{vy:X}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR V{vx:X}, V{vy:X}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND V{vx:X}, V{vy:X}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR V{vx:X}, V{vy:X}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD V{vx:X}, V{vy:X}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB V{vx:X}, V{vy:X}"),
            Op::ShiftRight { vx, .. } => write!(f, "SHR V{vx:X}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN V{vx:X}, V{vy:X}"),
            Op::ShiftLeft { vx, .. } => write!(f, "SHL V{vx:X}"),
            // ------
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE V{vx:X}, V{vy:X}"),
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "JP V0, 0x{address:03X}"),
            Op::Random { vx, kk } => write!(f, "RND V{vx:X}, 0x{kk:02X}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW V{vx:X}, V{vy:X}, {n}"),
            Op::Skip_Key { vx } => write!(f, "SKP V{vx:X}"),
            Op::Skip_NotKey { vx } => write!(f, "SKNP V{vx:X}"),
            // ------
            Op::Load_Vx_Delay { vx } => write!(f, "LD V{vx:X}, DT"),
            Op::Load_Vx_Key { vx } => write!(f, "LD V{vx:X}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, V{vx:X}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, V{vx:X}"),
            Op::Add_I_Vx { vx } => write!(f, "ADD I, V{vx:X}"),
            Op::Load_Font { vx } => write!(f, "LD F, V{vx:X}"),
            Op::Load_Bcd { vx } => write!(f, "LD B, V{vx:X}"),
            Op::Store_Registers { vx } => write!(f, "LD [I], V{vx:X}"),
            Op::Load_Registers { vx } => write!(f, "LD V{vx:X}, [I]"),

            Op::Unknown(word) => write!(f, "0x{word:04X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_zero_word() {
        assert_eq!(Op::decode(0x0000), None);
    }

    #[test]
    #[rustfmt::skip]
    fn test_decode_table() {
        let table: &[(u16, Op)] = &[
            (0x0123, Op::System { address: 0x123 }),
            (0x00E0, Op::ClearScreen),
            (0x00EE, Op::Return),
            (0x1ABC, Op::JumpAddress { address: 0xABC }),
            (0x2DEF, Op::Call { address: 0xDEF }),
            (0x3A42, Op::Skip_Eq_Byte { vx: 0xA, kk: 0x42 }),
            (0x4B42, Op::Skip_NotEq_Byte { vx: 0xB, kk: 0x42 }),
            (0x5120, Op::Skip_Eq { vx: 1, vy: 2 }),
            (0x63FF, Op::Load_Byte { vx: 3, kk: 0xFF }),
            (0x7401, Op::Add_Byte { vx: 4, kk: 0x01 }),
            (0x8120, Op::Load_Vx_Vy { vx: 1, vy: 2 }),
            (0x8121, Op::Or_Vx_Vy { vx: 1, vy: 2 }),
            (0x8122, Op::And_Vx_Vy { vx: 1, vy: 2 }),
            (0x8123, Op::Xor_Vx_Vy { vx: 1, vy: 2 }),
            (0x8124, Op::Add_Vx_Vy { vx: 1, vy: 2 }),
            (0x8125, Op::Sub_Vx_Vy { vx: 1, vy: 2 }),
            (0x8126, Op::ShiftRight { vx: 1, vy: 2 }),
            (0x8127, Op::SubReverse_Vx_Vy { vx: 1, vy: 2 }),
            (0x812E, Op::ShiftLeft { vx: 1, vy: 2 }),
            (0x9560, Op::Skip_NotEq { vx: 5, vy: 6 }),
            (0xA234, Op::Load_Address { address: 0x234 }),
            (0xB300, Op::Jump_V0 { address: 0x300 }),
            (0xC70F, Op::Random { vx: 7, kk: 0x0F }),
            (0xD125, Op::Draw { vx: 1, vy: 2, n: 5 }),
            (0xE89E, Op::Skip_Key { vx: 8 }),
            (0xE9A1, Op::Skip_NotKey { vx: 9 }),
            (0xFA07, Op::Load_Vx_Delay { vx: 0xA }),
            (0xFB0A, Op::Load_Vx_Key { vx: 0xB }),
            (0xFC15, Op::Load_Delay_Vx { vx: 0xC }),
            (0xFD18, Op::Load_Sound_Vx { vx: 0xD }),
            (0xFE1E, Op::Add_I_Vx { vx: 0xE }),
            (0xFF29, Op::Load_Font { vx: 0xF }),
            (0xF033, Op::Load_Bcd { vx: 0 }),
            (0xF155, Op::Store_Registers { vx: 1 }),
            (0xF265, Op::Load_Registers { vx: 2 }),
        ];

        for (word, expected) in table {
            assert_eq!(Op::decode(*word), Some(*expected), "word 0x{word:04X}");
        }
    }

    #[test]
    fn test_decode_unknown() {
        for word in [0x5121, 0x912F, 0x8128, 0x812F, 0xE100, 0xF0FF, 0xF000] {
            assert_eq!(Op::decode(word), Some(Op::Unknown(word)), "word 0x{word:04X}");
        }
    }

    /// Every non-zero word decodes to something, and the class of a known op
    /// always matches the top nibble.
    #[test]
    fn test_decode_all_words() {
        for word in 1..=u16::MAX {
            let op = Op::decode(word).expect("only the zero word is not an instruction");
            let class = op_code(word);
            let expected_class = match op {
                Op::System { .. } | Op::ClearScreen | Op::Return => 0x0,
                Op::JumpAddress { .. } => 0x1,
                Op::Call { .. } => 0x2,
                Op::Skip_Eq_Byte { .. } => 0x3,
                Op::Skip_NotEq_Byte { .. } => 0x4,
                Op::Skip_Eq { .. } => 0x5,
                Op::Load_Byte { .. } => 0x6,
                Op::Add_Byte { .. } => 0x7,
                Op::Load_Vx_Vy { .. }
                | Op::Or_Vx_Vy { .. }
                | Op::And_Vx_Vy { .. }
                | Op::Xor_Vx_Vy { .. }
                | Op::Add_Vx_Vy { .. }
                | Op::Sub_Vx_Vy { .. }
                | Op::ShiftRight { .. }
                | Op::SubReverse_Vx_Vy { .. }
                | Op::ShiftLeft { .. } => 0x8,
                Op::Skip_NotEq { .. } => 0x9,
                Op::Load_Address { .. } => 0xA,
                Op::Jump_V0 { .. } => 0xB,
                Op::Random { .. } => 0xC,
                Op::Draw { .. } => 0xD,
                Op::Skip_Key { .. } | Op::Skip_NotKey { .. } => 0xE,
                Op::Load_Vx_Delay { .. }
                | Op::Load_Vx_Key { .. }
                | Op::Load_Delay_Vx { .. }
                | Op::Load_Sound_Vx { .. }
                | Op::Add_I_Vx { .. }
                | Op::Load_Font { .. }
                | Op::Load_Bcd { .. }
                | Op::Store_Registers { .. }
                | Op::Load_Registers { .. } => 0xF,
                Op::Unknown(w) => {
                    assert_eq!(w, word);
                    class
                }
            };
            assert_eq!(class, expected_class, "word 0x{word:04X}");
        }
    }

    #[test]
    fn test_instr_fields() {
        let instr = Instr {
            addr: 0x200,
            word: 0xD12F,
            op: Op::Draw { vx: 1, vy: 2, n: 0xF },
        };
        assert_eq!(instr.class(), 0xD);
        assert_eq!(instr.x(), 1);
        assert_eq!(instr.y(), 2);
        assert_eq!(instr.n(), 0xF);
        assert_eq!(instr.kk(), 0x2F);
        assert_eq!(instr.nnn(), 0x12F);
        assert!(!instr.is_unknown());
        assert_eq!(instr.to_string(), "0x0200  D12F  DRW V1, V2, 15");
    }

    #[test]
    fn test_mnemonics() {
        let render = |word| Op::decode(word).unwrap().to_string();
        assert_eq!(render(0x6005), "LD V0, 0x05");
        assert_eq!(render(0x8AB6), "SHR VA");
        assert_eq!(render(0xB210), "JP V0, 0x210");
        assert_eq!(render(0xF30A), "LD V3, K");
        assert_eq!(render(0xF455), "LD [I], V4");
        assert_eq!(render(0x5AB3), "0x5AB3");
    }
}
