//! CPU and memory state.
use crate::{
    bytecode::word, constants::*, font::FONTSET, framebuffer::Framebuffer, keypad::Keypad,
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: Address,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses are 12 bits, only the
    /// lowest (rightmost) bits are used.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Indicates that the machine is waiting for a keypress.
    pub(crate) key_wait: bool,
    pub(crate) keypad: Keypad,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to.
    pub(crate) display: Framebuffer,

    // ------------------------------------------------------------------------
    // Control
    /// Interrupt for VM loop.
    pub(crate) trap: bool,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_wait: false,
            keypad: Keypad::new(),

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Framebuffer::new(),

            trap: false,
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Return registers, stack, timers, memory and display to their power-on state.
    ///
    /// The keyboard is left alone, since it reflects the physical device.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_wait = false;
        self.keypad.clear_latch();
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.clear();
        self.trap = false;
        self.load_font();
    }

    fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Read a byte, wrapping the address to the 12-bit memory space.
    #[inline(always)]
    pub(crate) fn read(&self, addr: usize) -> u8 {
        self.ram[addr & ADDRESS_MASK]
    }

    /// Write a byte, wrapping the address to the 12-bit memory space.
    #[inline(always)]
    pub(crate) fn write(&mut self, addr: usize, value: u8) {
        self.ram[addr & ADDRESS_MASK] = value;
    }

    /// Extract the instruction word at the current program counter.
    #[inline(always)]
    pub fn instr(&self) -> u16 {
        let pc = self.pc as usize;
        word(self.read(pc), self.read(pc + 1))
    }

    /// Push a return address onto the call stack.
    ///
    /// Returns `false` when the stack is full, leaving it untouched.
    #[inline]
    #[must_use]
    pub(crate) fn push(&mut self, addr: Address) -> bool {
        if self.sp >= STACK_SIZE {
            return false;
        }
        self.stack[self.sp] = addr;
        self.sp += 1;
        true
    }

    /// Pop a return address off the call stack.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Address> {
        let sp = self.sp.checked_sub(1)?;
        self.sp = sp;
        Some(self.stack[sp])
    }

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Buzzer should be on while the sound timer counts down.
    #[inline(always)]
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }
}
