//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{
    bytecode::word,
    constants::*,
    opcode::{Instr, Op},
};

/// Linear disassembler for a program image.
///
/// Every word is decoded as an instruction, since code and data
/// can't be told apart without running the program.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Write the whole program listing.
    pub fn disassemble<W: FmtWrite>(&mut self, w: &mut W) -> fmt::Result {
        self.cursor = 0;
        while self.cursor < self.bytecode.len() {
            self.disassemble_one(w)?;
            self.cursor += INSTRUCTION_SIZE;
        }
        self.cursor = 0;

        Ok(())
    }

    /// Program listing as a string.
    pub fn listing(&mut self) -> String {
        let mut s = String::new();
        self.disassemble(&mut s)
            .expect("writing to a String cannot fail");
        s
    }

    /// Write a single instruction at the cursor to the given writer.
    fn disassemble_one<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        // Images larger than memory wrap, like the machine's address space.
        let addr = ((MEM_START + self.cursor) & ADDRESS_MASK) as Address;

        match &self.bytecode[self.cursor..] {
            &[a, b, ..] => {
                let word = word(a, b);
                match Op::decode(word) {
                    Some(op) => writeln!(w, "{}", Instr { addr, word, op }),
                    None => writeln!(w, "0x{addr:04X}  {word:04X}  ; zero"),
                }
            }
            // Odd trailing byte.
            &[a] => writeln!(w, "0x{addr:04X}  {a:02X}    ; data"),
            &[] => Ok(()),
        }
    }
}
