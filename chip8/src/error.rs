//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE, STACK_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    ProgramTooLarge { size: usize },
    /// Subroutine call while the call stack is already full.
    ///
    /// Address is the location of the offending `CALL`.
    StackOverflow { addr: Address },
    /// Subroutine return with nothing on the call stack.
    ///
    /// Address is the location of the offending `RET`.
    StackUnderflow { addr: Address },
    /// Configuration could not be parsed or was rejected.
    Config(String),
    Io(std::io::Error),
    Fmt(fmt::Error),
}

impl Chip8Error {
    /// Whether the machine can keep running after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StackOverflow { .. } | Self::StackUnderflow { .. }
        )
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramTooLarge { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {MAX_PROGRAM_SIZE}"
            ),
            Self::StackOverflow { addr } => write!(
                f,
                "call stack overflow at 0x{addr:03X}: more than {STACK_SIZE} nested calls"
            ),
            Self::StackUnderflow { addr } => {
                write!(f, "call stack underflow at 0x{addr:03X}: return without call")
            }
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Fmt(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
