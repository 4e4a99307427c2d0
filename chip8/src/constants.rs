//! Constant values of the Chip-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// Index of the flag register VF.
pub const FLAG_REGISTER: usize = 0xF;

/// The lower memory space was historically used for the interpreter itself,
/// but is now used for fonts.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Mask for the 12-bit address space.
pub const ADDRESS_MASK: usize = MEM_SIZE - 1;

/// Largest program image that fits between `MEM_START` and the end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - MEM_START; // 3584

/// Instructions are always two bytes wide.
pub const INSTRUCTION_SIZE: usize = 2;

/// Levels of nesting allowed in the call stack.
///
/// The original RCA 1802 implementation allocated 48 bytes
/// for up to 12 levels of nesting. Later interpreters settled on 16.
pub const STACK_SIZE: usize = 0x10; // 16

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_BUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;
pub const DISPLAY_WIDTH_MASK: usize = DISPLAY_WIDTH - 1;
pub const DISPLAY_HEIGHT_MASK: usize = DISPLAY_HEIGHT - 1;

/// Sprites are always 8 pixels wide, one bit per pixel.
pub const SPRITE_WIDTH: usize = 8;

/// Fonts are stored at the very start of memory.
pub const FONTSET_START: u16 = 0x000;
/// Each glyph is 4 pixels wide and 5 rows high.
pub const FONTSET_HEIGHT: usize = 5;
/// One glyph for each hexadecimal digit.
pub const FONTSET_GLYPH_COUNT: usize = 16;
pub const FONTSET_DATA_LENGTH: usize = FONTSET_HEIGHT * FONTSET_GLYPH_COUNT; // 80

/// Number of clock cycles in a second that delay timers count down.
pub const DELAY_FREQUENCY: u64 = 60;

/// Instruction clock used when none is configured.
pub const DEFAULT_CLOCK_FREQUENCY: u64 = 700;

/// Number of nanoseconds in a second
#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Number of keys on the keyboard (0x0-0xF)
pub const KEY_COUNT: u8 = 16;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;
