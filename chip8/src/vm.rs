//! Virtual machine.
use std::fmt::{self, Write};

use log::{debug, warn};
use rand::prelude::*;

use crate::{
    clock::Hz,
    constants::*,
    cpu::Chip8Cpu,
    error::{Chip8Error, Chip8Result},
    font::glyph_address,
    framebuffer::Framebuffer,
    keypad::{KeyCode, Keypad},
    opcode::{Instr, Op},
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Chip8Conf {
    /// Instruction clock. `None` means the driver's default.
    pub clock_frequency: Option<Hz>,
    /// Delay and sound timer clock.
    pub timer_frequency: Hz,
    /// Seed for the random number instruction, for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            clock_frequency: None,
            timer_frequency: Hz(DELAY_FREQUENCY),
            rng_seed: None,
        }
    }
}

impl Chip8Conf {
    /// Instruction clock, falling back to the default frequency.
    pub fn instruction_frequency(&self) -> Hz {
        self.clock_frequency
            .unwrap_or(Hz(DEFAULT_CLOCK_FREQUENCY))
    }
}

/// Reason a batch of steps stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    /// All requested steps were executed.
    Ok,
    /// The fetched word was zero, which is treated as the end of the program.
    Halt,
    /// The caller requested the VM to stop.
    Interrupt,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Copy a program image into memory at `0x200`, resetting the machine.
    ///
    /// A program that doesn't fit is rejected before anything is touched.
    pub fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::ProgramTooLarge {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        // Fonts are rewritten by the reset.
        self.cpu.reset();

        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.cpu.display
    }

    pub fn keypad(&self) -> &Keypad {
        &self.cpu.keypad
    }

    /// Whether the buzzer should be sounding.
    pub fn sound_active(&self) -> bool {
        self.cpu.sound_active()
    }

    /// Sets the keyboard key input state.
    ///
    /// A key going down while the VM waits on `Fx0A` will resume it
    /// on the next step.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.keypad.set(key, pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.keypad.clear()
    }

    /// Count down the delay and sound timers.
    ///
    /// Intended to be called at 60Hz, independent of instruction execution.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// Request the VM to stop between cycles.
    ///
    /// [`Chip8Vm::run_steps`] honors it before its next cycle and returns
    /// [`Flow::Interrupt`]. Driver loops built on [`Chip8Vm::step`] poll it
    /// with [`Chip8Vm::take_interrupt`]. Calling `step` directly is an explicit
    /// resume and discards a pending interrupt.
    ///
    /// State is left consistent, so execution can be resumed.
    pub fn interrupt(&mut self) {
        self.cpu.trap = true;
    }

    /// Whether an interrupt is pending, without consuming it.
    pub fn is_interrupted(&self) -> bool {
        self.cpu.trap
    }

    /// Consume a pending interrupt, returning whether there was one.
    pub fn take_interrupt(&mut self) -> bool {
        std::mem::replace(&mut self.cpu.trap, false)
    }

    /// Whether the VM is stalled on `Fx0A` (`LD Vx, K`).
    pub fn is_waiting_for_key(&self) -> bool {
        self.cpu.key_wait
    }
}

/// Register and memory inspection.
impl Chip8Vm {
    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    /// Value of the address register `I`.
    pub fn address(&self) -> Address {
        self.cpu.address
    }

    /// Number of return addresses on the call stack.
    pub fn stack_depth(&self) -> usize {
        self.cpu.sp
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.cpu.ram
    }
}

/// Interpreter
impl Chip8Vm {
    /// Execute up to `step_count` cycles.
    ///
    /// Stops early when the program halts, the VM is interrupted
    /// or it stalls waiting for a key.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        for _ in 0..step_count {
            if self.take_interrupt() {
                return Ok(Flow::Interrupt);
            }

            match self.cycle()? {
                None => return Ok(Flow::Halt),
                Some(_) if self.cpu.key_wait => return Ok(Flow::KeyWait),
                Some(_) => {}
            }
        }

        Ok(Flow::Ok)
    }

    /// Execute exactly one fetch-decode-execute cycle.
    ///
    /// Returns the executed instruction, or `None` when the fetched
    /// word was zero. A halted machine does not advance.
    ///
    /// On error the program counter is left pointing at the
    /// faulting instruction and no other state is changed.
    ///
    /// A pending interrupt is discarded.
    pub fn step(&mut self) -> Chip8Result<Option<Instr>> {
        if self.take_interrupt() {
            debug!("pending interrupt discarded by explicit step");
        }
        self.cycle()
    }

    fn cycle(&mut self) -> Chip8Result<Option<Instr>> {
        let addr = self.cpu.pc;
        let word = self.cpu.instr();

        let op = match Op::decode(word) {
            Some(op) => op,
            None => return Ok(None),
        };
        let instr = Instr { addr, word, op };

        op_trace(&instr);

        self.cpu.pc = next_addr(addr);

        if let Err(err) = self.exec(&instr) {
            self.cpu.pc = addr;
            return Err(err);
        }

        Ok(Some(instr))
    }

    #[inline(always)]
    fn skip(&mut self) {
        self.cpu.pc = next_addr(self.cpu.pc);
    }

    fn exec(&mut self, instr: &Instr) -> Chip8Result<()> {
        match instr.op {
            // Legacy machine code routines are ignored.
            Op::System { .. } => {}
            Op::ClearScreen => self.cpu.display.clear(),
            // Set the program counter to the value at the top of the stack.
            Op::Return => match self.cpu.pop() {
                Some(ret) => self.cpu.pc = ret,
                None => return Err(Chip8Error::StackUnderflow { addr: instr.addr }),
            },
            Op::JumpAddress { address } => self.cpu.pc = address,
            // The return address is the instruction following the call.
            Op::Call { address } => {
                if !self.cpu.push(self.cpu.pc) {
                    return Err(Chip8Error::StackOverflow { addr: instr.addr });
                }
                self.cpu.pc = address;
            }
            Op::Skip_Eq_Byte { vx, kk } => {
                if self.cpu.registers[vx as usize] == kk {
                    self.skip();
                }
            }
            Op::Skip_NotEq_Byte { vx, kk } => {
                if self.cpu.registers[vx as usize] != kk {
                    self.skip();
                }
            }
            Op::Skip_Eq { vx, vy } => {
                if self.cpu.registers[vx as usize] == self.cpu.registers[vy as usize] {
                    self.skip();
                }
            }
            Op::Load_Byte { vx, kk } => self.cpu.registers[vx as usize] = kk,
            Op::Add_Byte { vx, kk } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x.wrapping_add(kk);
            }
            Op::Skip_NotEq { vx, vy } => {
                if self.cpu.registers[vx as usize] != self.cpu.registers[vy as usize] {
                    self.skip();
                }
            }
            Op::Load_Address { address } => self.cpu.address = address,
            Op::Jump_V0 { address } => {
                let offset = self.cpu.registers[0] as Address;
                self.cpu.pc = (address + offset) & ADDRESS_MASK as Address;
            }
            Op::Random { vx, kk } => {
                self.cpu.registers[vx as usize] = kk & self.rng.gen::<u8>();
            }
            Op::Draw { vx, vy, n } => self.exec_draw(vx, vy, n),
            Op::Skip_Key { vx } => {
                if self.cpu.keypad.is_pressed(self.cpu.registers[vx as usize]) {
                    self.skip();
                }
            }
            Op::Skip_NotKey { vx } => {
                if !self.cpu.keypad.is_pressed(self.cpu.registers[vx as usize]) {
                    self.skip();
                }
            }
            Op::Unknown(word) => {
                warn!(
                    "unknown opcode 0x{word:04X} at 0x{:03X}, skipping",
                    instr.addr
                );
            }
            Op::Load_Vx_Vy { vx, vy }
            | Op::Or_Vx_Vy { vx, vy }
            | Op::And_Vx_Vy { vx, vy }
            | Op::Xor_Vx_Vy { vx, vy }
            | Op::Add_Vx_Vy { vx, vy }
            | Op::Sub_Vx_Vy { vx, vy }
            | Op::ShiftRight { vx, vy }
            | Op::SubReverse_Vx_Vy { vx, vy }
            | Op::ShiftLeft { vx, vy } => self.exec_math(instr.op, vx, vy),
            Op::Load_Vx_Delay { vx }
            | Op::Load_Vx_Key { vx }
            | Op::Load_Delay_Vx { vx }
            | Op::Load_Sound_Vx { vx }
            | Op::Add_I_Vx { vx }
            | Op::Load_Font { vx }
            | Op::Load_Bcd { vx }
            | Op::Store_Registers { vx }
            | Op::Load_Registers { vx } => self.exec_misc(instr, vx),
        }

        Ok(())
    }

    /// Execute an arithmetic instruction
    ///
    /// Instructions that produce a flag write the result first and VF last,
    /// so the flag wins when Vx is VF.
    #[inline]
    fn exec_math(&mut self, op: Op, vx: u8, vy: u8) {
        let (x, y) = (
            self.cpu.registers[vx as usize],
            self.cpu.registers[vy as usize],
        );

        let (result, flag) = match op {
            Op::Load_Vx_Vy { .. } => (y, None),
            Op::Or_Vx_Vy { .. } => (x | y, None),
            Op::And_Vx_Vy { .. } => (x & y, None),
            Op::Xor_Vx_Vy { .. } => (x ^ y, None),
            // Overflow is wrapped, and carried into VF.
            Op::Add_Vx_Vy { .. } => {
                let (sum, carry) = x.overflowing_add(y);
                (sum, Some(carry as u8))
            }
            // VF is 1 when there is no borrow.
            Op::Sub_Vx_Vy { .. } => (x.wrapping_sub(y), Some((x >= y) as u8)),
            Op::SubReverse_Vx_Vy { .. } => (y.wrapping_sub(x), Some((y >= x) as u8)),
            // The flag is the bit shifted out.
            Op::ShiftRight { .. } => (x >> 1, Some(x & 1)),
            Op::ShiftLeft { .. } => (x << 1, Some((x >> 7) & 1)),
            _ => unreachable!("not an arithmetic op: {op:?}"),
        };

        self.cpu.registers[vx as usize] = result;
        if let Some(flag) = flag {
            self.cpu.registers[FLAG_REGISTER] = flag;
        }
    }

    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
    /// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
    /// memory pointed to by address register I.
    ///
    /// If the drawing operation erases existing pixels in the display buffer, register VF is set to
    /// 1, and set to 0 if no display bits are unset. This is used for collision detection.
    fn exec_draw(&mut self, vx: u8, vy: u8, n: u8) {
        let (x, y) = (
            self.cpu.registers[vx as usize] as usize,
            self.cpu.registers[vy as usize] as usize,
        );
        let base = self.cpu.address as usize;
        let ram = &self.cpu.ram;

        let rows = (0..n as usize).map(|r| ram[(base + r) & ADDRESS_MASK]);
        let is_erased = self.cpu.display.draw_sprite(x, y, rows);

        self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
    }

    /// Execute a timer, keyboard or memory instruction from the `Fx` family.
    fn exec_misc(&mut self, instr: &Instr, vx: u8) {
        let x = self.cpu.registers[vx as usize];
        let addr = self.cpu.address as usize;

        match instr.op {
            Op::Load_Vx_Delay { .. } => self.cpu.registers[vx as usize] = self.cpu.delay_timer,
            // All execution stops until a key is pressed, then the value of that key is stored in Vx.
            Op::Load_Vx_Key { .. } => {
                if !self.cpu.key_wait {
                    // Only presses from here on count.
                    self.cpu.keypad.clear_latch();
                    self.cpu.key_wait = true;
                    debug!("waiting for key press at 0x{:03X}", instr.addr);
                }

                match self.cpu.keypad.take_latch() {
                    Some(key) => {
                        debug!("key {key} pressed, resuming");
                        self.cpu.registers[vx as usize] = key.as_u8();
                        self.cpu.key_wait = false;
                    }
                    None => {
                        // rewind the program counter to stall the machine
                        self.cpu.pc = instr.addr;
                    }
                }
            }
            Op::Load_Delay_Vx { .. } => self.cpu.delay_timer = x,
            Op::Load_Sound_Vx { .. } => self.cpu.sound_timer = x,
            Op::Add_I_Vx { .. } => {
                self.cpu.address = (self.cpu.address + x as Address) & ADDRESS_MASK as Address;
            }
            Op::Load_Font { .. } => self.cpu.address = glyph_address(x),
            #[rustfmt::skip]
            Op::Load_Bcd { .. } => {
                self.cpu.write(addr,     x / 100);
                self.cpu.write(addr + 1, x / 10 % 10);
                self.cpu.write(addr + 2, x % 10);
            }
            Op::Store_Registers { .. } => {
                for v in 0..=vx as usize {
                    self.cpu.write(addr + v, self.cpu.registers[v]);
                }
            }
            Op::Load_Registers { .. } => {
                for v in 0..=vx as usize {
                    self.cpu.registers[v] = self.cpu.read(addr + v);
                }
            }
            _ => unreachable!("not a misc op: {:?}", instr.op),
        }
    }
}

/// Address of the instruction following the one at `addr`.
#[inline(always)]
fn next_addr(addr: Address) -> Address {
    (addr + INSTRUCTION_SIZE as Address) & ADDRESS_MASK as Address
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for addr in (MEM_START..MEM_SIZE).take(count).step_by(INSTRUCTION_SIZE) {
            let a = self.cpu.read(addr);
            let b = self.cpu.read(addr + 1);
            writeln!(buf, "{addr:04X}: {a:02X}{b:02X}")?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for row in self.cpu.display.rows() {
            for px in row {
                buf.write_char(if *px { '#' } else { '.' })?;
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.keypad.any_key() {
            write!(buf, "keys:")?;
            for key in KeyCode::ALL {
                if self.cpu.keypad.is_pressed(key.as_u8()) {
                    write!(buf, " {key}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(instr: &Instr) {
    log::trace!("{instr}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: &Instr) {}

#[cfg(test)]
mod test {
    use super::*;

    fn vm_with(program: &[u8]) -> Chip8Vm {
        let mut vm = Chip8Vm::new(Chip8Conf {
            rng_seed: Some(7),
            ..Default::default()
        });
        vm.load_program(program).unwrap();
        vm
    }

    /// Run a single arithmetic instruction `8xyN` on V1 and V2.
    fn math(n: u8, x: u8, y: u8) -> (u8, u8) {
        let mut vm = vm_with(&[0x81, 0x20 | n]);
        vm.cpu.registers[1] = x;
        vm.cpu.registers[2] = y;
        vm.step().unwrap();
        (vm.cpu.registers[1], vm.cpu.registers[0xF])
    }

    #[test]
    fn test_add_carry_exhaustive() {
        for x in 0..=255u8 {
            for y in 0..=255u8 {
                let sum = x as u16 + y as u16;
                let (result, vf) = math(0x4, x, y);
                assert_eq!(result, (sum % 256) as u8);
                assert_eq!(vf, (sum > 255) as u8, "{x} + {y}");
            }
        }
    }

    #[test]
    fn test_sub_borrow() {
        assert_eq!(math(0x5, 5, 5), (0, 1));
        assert_eq!(math(0x5, 3, 5), (254, 0));
        assert_eq!(math(0x5, 200, 1), (199, 1));
    }

    #[test]
    fn test_subn_borrow() {
        assert_eq!(math(0x7, 5, 5), (0, 1));
        assert_eq!(math(0x7, 5, 3), (254, 0));
        assert_eq!(math(0x7, 1, 200), (199, 1));
    }

    #[test]
    fn test_shifts() {
        assert_eq!(math(0x6, 0b0000_0011, 0), (0b0000_0001, 1));
        assert_eq!(math(0x6, 0b0000_0010, 0), (0b0000_0001, 0));
        assert_eq!(math(0xE, 0b1000_0001, 0), (0b0000_0010, 1));
        assert_eq!(math(0xE, 0b0100_0000, 0), (0b1000_0000, 0));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(math(0x0, 0x12, 0x34).0, 0x34);
        assert_eq!(math(0x1, 0b1100, 0b1010).0, 0b1110);
        assert_eq!(math(0x2, 0b1100, 0b1010).0, 0b1000);
        assert_eq!(math(0x3, 0b1100, 0b1010).0, 0b0110);
    }

    /// The flag is written after the result when Vx is VF.
    #[test]
    fn test_flag_overwrites_vf_target() {
        let mut vm = vm_with(&[0x8F, 0x14]); // ADD VF, V1
        vm.cpu.registers[0xF] = 0xFF;
        vm.cpu.registers[1] = 0x02;
        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[0xF], 1);
    }

    #[test]
    fn test_add_byte_wraps_without_flag() {
        let mut vm = vm_with(&[0x71, 0x02]);
        vm.cpu.registers[1] = 0xFF;
        vm.cpu.registers[0xF] = 0x42;
        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[1], 0x01);
        assert_eq!(vm.cpu.registers[0xF], 0x42);
    }

    #[test]
    #[rustfmt::skip]
    fn test_skips() {
        let mut vm = vm_with(&[
            0x31, 0x05, // SE V1, 5      ; skip
            0x00, 0x00,
            0x41, 0x05, // SNE V1, 5     ; no skip
            0x51, 0x20, // SE V1, V2     ; no skip
            0x91, 0x20, // SNE V1, V2    ; skip
            0x00, 0x00,
        ]);
        vm.cpu.registers[1] = 5;
        vm.cpu.registers[2] = 6;

        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x204);
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x206);
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x208);
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x20C);
    }

    #[test]
    fn test_jump_v0() {
        let mut vm = vm_with(&[0xB3, 0x00]);
        vm.cpu.registers[0] = 0x10;
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x310);

        // Wraps within the address space.
        let mut vm = vm_with(&[0xBF, 0xFF]);
        vm.cpu.registers[0] = 0x03;
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x002);
    }

    #[test]
    fn test_random_is_masked() {
        let mut vm = vm_with(&[0xC1, 0x0F, 0x12, 0x00]);
        for _ in 0..100 {
            vm.cpu.pc = 0x200;
            vm.step().unwrap();
            assert_eq!(vm.cpu.registers[1] & 0xF0, 0);
        }
    }

    #[test]
    fn test_random_seed_is_reproducible() {
        let mut a = vm_with(&[0xC1, 0xFF]);
        let mut b = vm_with(&[0xC1, 0xFF]);
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.cpu.registers[1], b.cpu.registers[1]);
    }

    #[test]
    fn test_call_return() {
        let mut vm = vm_with(&[]);
        vm.cpu.ram[0x300] = 0x24; // CALL 0x400
        vm.cpu.ram[0x301] = 0x00;
        vm.cpu.ram[0x400] = 0x00; // RET
        vm.cpu.ram[0x401] = 0xEE;
        vm.cpu.pc = 0x300;

        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x400);
        assert_eq!(vm.cpu.sp, 1);

        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x302);
        assert_eq!(vm.cpu.sp, 0);
    }

    #[test]
    fn test_stack_underflow() {
        let mut vm = vm_with(&[0x00, 0xEE]);
        let err = vm.step().unwrap_err();
        assert!(matches!(err, Chip8Error::StackUnderflow { addr: 0x200 }));
        assert_eq!(vm.cpu.pc, 0x200);
        assert_eq!(vm.cpu.sp, 0);
    }

    #[test]
    fn test_timer_instructions() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x61, 0x03, // LD V1, 3
            0xF1, 0x15, // LD DT, V1
            0xF1, 0x18, // LD ST, V1
            0xF2, 0x07, // LD V2, DT
        ]);
        vm.run_steps(3).unwrap();
        assert_eq!(vm.delay_timer(), 3);
        assert!(vm.sound_active());

        vm.tick_timers();
        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[2], 2);
        assert_eq!(vm.sound_timer(), 2);

        vm.tick_timers();
        vm.tick_timers();
        vm.tick_timers();
        assert_eq!(vm.delay_timer(), 0);
        assert!(!vm.sound_active());
    }

    /// Timers only count down on an explicit tick, never per instruction.
    #[test]
    fn test_timers_decoupled_from_steps() {
        let mut vm = vm_with(&[0x61, 0x10, 0xF1, 0x15, 0x12, 0x04]);
        vm.run_steps(100).unwrap();
        assert_eq!(vm.delay_timer(), 0x10);
    }

    #[test]
    fn test_add_i_wraps() {
        let mut vm = vm_with(&[0xAF, 0xFF, 0xF1, 0x1E]);
        vm.cpu.registers[1] = 2;
        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.address, 0x001);
    }

    #[test]
    fn test_load_font() {
        let mut vm = vm_with(&[0xF1, 0x29]);
        vm.cpu.registers[1] = 0xAB;
        vm.step().unwrap();
        assert_eq!(vm.cpu.address, FONTSET_START + 0xB * 5);
    }

    #[test]
    fn test_bcd() {
        let mut vm = vm_with(&[0xA3, 0x00, 0xF1, 0x33]);
        vm.cpu.registers[1] = 254;
        vm.run_steps(2).unwrap();
        assert_eq!(&vm.cpu.ram[0x300..0x303], &[2, 5, 4]);
    }

    #[test]
    fn test_store_load_registers() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0xA3, 0x00, // LD I, 0x300
            0xF2, 0x55, // LD [I], V2
            0xF3, 0x65, // LD V3, [I]
        ]);
        vm.cpu.registers[0..4].copy_from_slice(&[1, 2, 3, 4]);
        vm.cpu.ram[0x303] = 9;

        vm.run_steps(2).unwrap();
        assert_eq!(&vm.cpu.ram[0x300..0x304], &[1, 2, 3, 9]);
        assert_eq!(vm.cpu.address, 0x300);

        vm.cpu.registers[0..4].fill(0);
        vm.step().unwrap();
        assert_eq!(&vm.cpu.registers[0..5], &[1, 2, 3, 9, 0]);
    }

    #[test]
    fn test_indexed_access_wraps() {
        let mut vm = vm_with(&[0xAF, 0xFF, 0xF1, 0x55]);
        vm.cpu.registers[0] = 0xAA;
        vm.cpu.registers[1] = 0xBB;
        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.ram[0xFFF], 0xAA);
        assert_eq!(vm.cpu.ram[0x000], 0xBB);
    }

    #[test]
    #[rustfmt::skip]
    fn test_key_skips() {
        let mut vm = vm_with(&[
            0xE1, 0x9E, // SKP V1
            0x00, 0x00,
            0xE1, 0xA1, // SKNP V1
        ]);
        vm.cpu.registers[1] = 0x5;
        vm.set_key(KeyCode::Key5, true);

        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x204);
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, 0x206);
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a keypress, then store the key value in Vx.
    /// The VM must stall while waiting, and signal the state to the outer executer.
    #[test]
    #[rustfmt::skip]
    fn test_key_wait() {
        let mut vm = vm_with(&[
            0xF1, 0x0A, // LD v1, K
            0x62, 0x42  // LD v2, 0x42  ; sentinal
        ]);

        // machine must stall
        for _ in 0..6 {
            let instr = vm.step().unwrap().unwrap();
            assert_eq!(instr.op, Op::Load_Vx_Key { vx: 1 });
            assert_eq!(vm.cpu.pc, MEM_START as Address);
            assert!(vm.is_waiting_for_key());
        }
        assert_eq!(vm.run_steps(10).unwrap(), Flow::KeyWait);
        assert_eq!(vm.cpu.pc, MEM_START as Address);

        // machine has yielded, waiting for any key to be pressed.
        vm.set_key(KeyCode::Key5, true);

        // machine will now advance
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, MEM_START as Address + 2);
        assert!(!vm.is_waiting_for_key());
        assert_eq!(vm.cpu.registers[1], 0x05);

        // Ensure the machine is continuing
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, MEM_START as Address + 4);
        assert_eq!(vm.cpu.registers[2], 0x42); // sentinal
    }

    /// A key held before the wait started must be released and pressed again.
    #[test]
    fn test_key_wait_needs_new_press() {
        let mut vm = vm_with(&[0xF1, 0x0A]);
        vm.set_key(KeyCode::Key3, true);

        vm.step().unwrap();
        vm.step().unwrap();
        assert!(vm.is_waiting_for_key());

        vm.set_key(KeyCode::Key3, false);
        vm.step().unwrap();
        assert!(vm.is_waiting_for_key());

        vm.set_key(KeyCode::Key3, true);
        vm.step().unwrap();
        assert!(!vm.is_waiting_for_key());
        assert_eq!(vm.cpu.registers[1], 3);
    }

    #[test]
    fn test_interrupt_during_key_wait() {
        let mut vm = vm_with(&[0xF1, 0x0A, 0x62, 0x42]);
        assert_eq!(vm.run_steps(5).unwrap(), Flow::KeyWait);

        vm.interrupt();
        assert_eq!(vm.run_steps(5).unwrap(), Flow::Interrupt);
        assert_eq!(vm.cpu.pc, MEM_START as Address);
        assert!(vm.is_waiting_for_key());

        // Resumable after the interrupt.
        vm.set_key(KeyCode::KeyA, true);
        assert_eq!(vm.run_steps(2).unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.registers[1], 0xA);
        assert_eq!(vm.cpu.registers[2], 0x42);
    }

    #[test]
    fn test_step_discards_stale_interrupt() {
        let mut vm = vm_with(&[0x12, 0x00]); // JP 0x200
        vm.interrupt();
        assert!(vm.is_interrupted());

        for _ in 0..10 {
            assert!(vm.step().unwrap().is_some());
        }
        assert!(!vm.is_interrupted());
        assert_eq!(vm.run_steps(5).unwrap(), Flow::Ok);
    }

    #[test]
    fn test_take_interrupt() {
        let mut vm = vm_with(&[0x12, 0x00]);
        assert!(!vm.take_interrupt());

        vm.interrupt();
        assert!(vm.take_interrupt());
        assert!(!vm.take_interrupt());
        assert_eq!(vm.run_steps(5).unwrap(), Flow::Ok);
    }

    #[test]
    fn test_unknown_opcode_is_skipped() {
        let mut vm = vm_with(&[0x51, 0x21, 0x61, 0x01]);
        let instr = vm.step().unwrap().unwrap();
        assert!(instr.is_unknown());
        assert_eq!(vm.cpu.pc, 0x202);

        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[1], 1);
    }

    #[test]
    fn test_halt_on_zero_word() {
        let mut vm = vm_with(&[0x61, 0x01]);
        assert_eq!(vm.run_steps(10).unwrap(), Flow::Halt);
        assert_eq!(vm.cpu.pc, 0x202);
        assert_eq!(vm.step().unwrap(), None);
        assert_eq!(vm.cpu.pc, 0x202);
    }

    #[test]
    fn test_draw_collision() {
        // Draw two sprites next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        //
        // draw sprite 1
        // ____####, vf == 0
        //
        // draw sprite 2
        // ####____, vf == 0
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0xA2, 0x0C, // LD I, .sprite
            0x60, 0x04, // LD v0, 4
            0x61, 0x00, // LD v1, 0
            0xD0, 0x11, // DRW v0, v1, 1
            0x60, 0x00, // LD v0, 0
            0xD0, 0x11, // DRW v0, v1, 1
            // .sprite
            0b11110000,
            0b00000000,
        ]);

        vm.run_steps(6).unwrap();

        assert!(vm.framebuffer().get(0, 0)); // sprite 2
        assert!(vm.framebuffer().get(4, 0)); // sprite 1
        assert!(!vm.framebuffer().get(8, 0));
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_dump_display() {
        let mut vm = vm_with(&[0xD0, 0x01]); // DRW v0, v0, 1 with I = glyph 0
        vm.step().unwrap();
        let dump = vm.dump_display().unwrap();
        let first = dump.lines().next().unwrap();
        assert_eq!(first.len(), DISPLAY_WIDTH);
        assert!(first.starts_with("####...."));
        assert_eq!(dump.lines().count(), DISPLAY_HEIGHT);
    }

    #[test]
    fn test_dump_ram_and_keys() {
        let mut vm = vm_with(&[0x60, 0x05, 0x70, 0x03]);
        assert_eq!(vm.dump_ram(4).unwrap(), "0200: 6005\n0202: 7003\n");

        assert_eq!(vm.dump_keys().unwrap(), "");
        vm.set_key(KeyCode::Key1, true);
        vm.set_key(KeyCode::KeyE, true);
        assert_eq!(vm.dump_keys().unwrap(), "keys: k1 ke");
        assert_eq!(vm.keypad().first_key(), Some(KeyCode::Key1));

        vm.clear_keys();
        assert!(!vm.keypad().any_key());
    }
}
