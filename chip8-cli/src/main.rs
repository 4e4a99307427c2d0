//! Entrypoint for CLI
mod args;
mod rom;

use std::{env, error::Error, fs, thread, time::Instant};

use chip8::{prelude::*, Clock, IMPL_VERSION};
use log::{debug, error, info, warn};

use self::{
    args::{parse_args, Cmd, RunOpts},
    rom::Rom,
};

static USAGE: &str = r#"
usage: chip8 CMD [OPTIONS] FILE

commands:
    run     Run the target ROM file headless, then print the display
    dis     Disassemble the target ROM into readable assembly

run options:
    --config FILE   YAML file with VM configuration
    --hz N          Instruction clock in hertz, 0 runs unthrottled
    --steps N       Stop after N instructions

examples:
    chip8 run breakout.rom
    chip8 run --hz 0 --steps 10000 maze.rom
    chip8 dis breakout.rom
"#;

fn load_conf(opts: &RunOpts) -> Chip8Result<Chip8Conf> {
    let mut conf: Chip8Conf = match &opts.config {
        Some(path) => {
            let source = fs::read_to_string(path)?;
            serde_yaml::from_str(&source)
                .map_err(|err| Chip8Error::Config(format!("{path}: {err}")))?
        }
        None => Chip8Conf::default(),
    };

    if opts.clock_frequency.is_some() {
        conf.clock_frequency = opts.clock_frequency;
    }

    Ok(conf)
}

fn run_bytecode(filepath: impl AsRef<str>, opts: RunOpts) -> Chip8Result<()> {
    let rom = Rom::from_file(filepath.as_ref())?;
    let conf = load_conf(&opts)?;

    info!(
        "running {} ({} bytes) at {}Hz",
        rom.name,
        rom.data.len(),
        conf.instruction_frequency().0
    );

    let mut vm = Chip8Vm::new(conf);
    vm.load_program(&rom.data)?;

    let start = Instant::now();
    let result = drive(&mut vm, opts.max_steps);
    let end = Instant::now();

    info!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);

    result.map(|steps| info!("executed {steps} instructions"))
}

/// Headless driver loop.
///
/// Runs the instruction clock and the timer clock side by side until
/// the program halts, stalls on input, is interrupted or the step limit
/// is reached. Neither clock blocks the other, so the timers keep their
/// own rate whatever the instruction rate is.
/// There is no keyboard attached, so a key wait ends the run.
fn drive(vm: &mut Chip8Vm, max_steps: Option<usize>) -> Chip8Result<usize> {
    let mut cpu_clock = Clock::from_hz(vm.config().instruction_frequency());
    let mut timer_clock = Clock::from_hz(vm.config().timer_frequency);
    let mut buzzer = false;
    let mut steps = 0;

    loop {
        if max_steps.map_or(false, |max| steps >= max) {
            info!("step limit reached");
            break;
        }

        let timer_due = timer_clock.tick();
        if timer_due {
            vm.tick_timers();
        }

        if vm.sound_active() != buzzer {
            buzzer = vm.sound_active();
            debug!("buzzer {}", if buzzer { "on" } else { "off" });
        }

        if !cpu_clock.tick() {
            if !timer_due {
                thread::yield_now();
            }
            continue;
        }

        if vm.take_interrupt() {
            info!("interrupted at 0x{:03X}", vm.pc());
            break;
        }

        match vm.step()? {
            None => {
                info!("program halted at 0x{:03X}", vm.pc());
                break;
            }
            Some(instr) if vm.is_waiting_for_key() => {
                warn!(
                    "program waits for key input at 0x{:03X}, but no keyboard is attached",
                    instr.addr
                );
                break;
            }
            Some(_) => steps += 1,
        }
    }

    Ok(steps)
}

fn run_disassembler(filepath: impl AsRef<str>) -> Chip8Result<()> {
    let rom = Rom::from_file(filepath.as_ref())?;
    info!("disassembling {} ({} bytes)", rom.name, rom.data.len());

    print!("{}", Disassembler::new(&rom.data).listing());

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init()?;

    let result = match parse_args(env::args().skip(1)) {
        Some(Cmd::Run { filepath, opts }) => run_bytecode(filepath, opts),
        Some(Cmd::Dis { filepath }) => run_disassembler(filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }

    Ok(())
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}
