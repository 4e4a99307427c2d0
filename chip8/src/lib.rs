//! Chip-8 virtual machine.
//!
//! The embedding application owns the clocks: it calls [`prelude::Chip8Vm::step`]
//! at the instruction rate and [`prelude::Chip8Vm::tick_timers`] at 60Hz, feeds
//! key state in with `set_key`, and reads the framebuffer between cycles.
mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod disasm;
mod error;
mod font;
mod framebuffer;
mod keypad;
mod opcode;
mod vm;

pub use self::clock::{Clock, Hz};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        font::FONTSET,
        framebuffer::Framebuffer,
        keypad::{InvalidKeyCode, KeyCode, Keypad},
        opcode::{Instr, Op},
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
