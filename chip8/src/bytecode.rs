//! Helpers for extracting data from instruction words.
//!
//! Every instruction is a big-endian 16-bit word. The nibbles are laid out as:
//!
//! ```text
//! [c___] opcode class
//! [_x__] register Vx
//! [__y_] register Vy
//! [___n] 4-bit value
//! [__kk] 8-bit value
//! [_nnn] 12-bit address
//! ```

/// Combine two bytes read from memory into an instruction word.
#[inline(always)]
pub fn word(a: u8, b: u8) -> u16 {
    ((a as u16) << 8) | b as u16
}

/// Extract the opcode class from the top nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand NNN.
#[inline(always)]
pub fn op_nnn(word: u16) -> u16 {
    word & 0x0FFF
}

/// Extract operand KK, the low byte.
#[inline(always)]
pub fn op_kk(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand VX.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand VY.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N, the last nibble.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}
