//! Command line arguments.
use chip8::Hz;
use log::error;

pub enum Cmd {
    /// Run file
    Run { filepath: String, opts: RunOpts },
    /// Disassemble file
    Dis { filepath: String },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunOpts {
    /// YAML file with VM configuration.
    pub config: Option<String>,
    /// Overrides the configured instruction clock.
    pub clock_frequency: Option<Hz>,
    /// Stop after this many instructions.
    pub max_steps: Option<usize>,
}

pub fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Cmd> {
    let cmd = args.next()?;

    match cmd.as_str() {
        "run" => {
            let mut opts = RunOpts::default();
            let mut filepath = None;

            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--config" => opts.config = Some(consume_arg(&mut args, &arg)?),
                    "--hz" => opts.clock_frequency = Some(Hz(parse_num(&mut args, &arg)?)),
                    "--steps" => opts.max_steps = Some(parse_num(&mut args, &arg)?),
                    _ if filepath.is_none() => filepath = Some(arg),
                    _ => {
                        error!("unexpected argument: {arg}");
                        return None;
                    }
                }
            }

            Some(Cmd::Run {
                filepath: filepath?,
                opts,
            })
        }
        "dis" => Some(Cmd::Dis {
            filepath: args.next()?,
        }),
        _ => {
            error!("unknown command: {cmd}");
            None
        }
    }
}

/// Consumes the value following a flag.
fn consume_arg(args: &mut impl Iterator<Item = String>, flag: &str) -> Option<String> {
    let value = args.next();
    if value.is_none() {
        error!("missing value for {flag}");
    }
    value
}

fn parse_num<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Option<T> {
    let value = consume_arg(args, flag)?;
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            error!("{flag} expects a number, got {value:?}");
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(line: &str) -> Option<Cmd> {
        parse_args(line.split_whitespace().map(String::from))
    }

    #[test]
    fn test_run_with_options() {
        match parse("run --hz 500 pong.rom --steps 1000") {
            Some(Cmd::Run { filepath, opts }) => {
                assert_eq!(filepath, "pong.rom");
                assert_eq!(
                    opts,
                    RunOpts {
                        config: None,
                        clock_frequency: Some(Hz(500)),
                        max_steps: Some(1000),
                    }
                );
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_dis() {
        assert!(matches!(parse("dis maze.rom"), Some(Cmd::Dis { filepath }) if filepath == "maze.rom"));
    }

    #[test]
    fn test_bad_usage() {
        assert!(parse("").is_none());
        assert!(parse("asm maze.asm").is_none());
        assert!(parse("run").is_none());
        assert!(parse("run --hz fast maze.rom").is_none());
        assert!(parse("run maze.rom --steps").is_none());
        assert!(parse("run a.rom b.rom").is_none());
    }
}
