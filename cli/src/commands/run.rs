use std::fs;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use intcode_machine::constants::{Address, Word};
use intcode_machine::runtime::io::{Console, Input, Queue};
use intcode_machine::{display_program, parse_program, Machine};
use tracing::{debug, info};

use crate::commands::report_parse_error;
use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    program: Utf8PathBuf,

    /// Pre-supplied input values for the read instruction. Without this,
    /// reads prompt on the console.
    #[clap(long = "input", value_name = "WORD")]
    inputs: Vec<Word>,

    /// Override a memory slot before execution
    #[clap(short, long, value_name = "ADDR=WORD", value_parser = parse_patch)]
    patch: Vec<(Address, Word)>,

    /// Print the final memory in load format after the run
    #[clap(long, action = ArgAction::SetTrue)]
    dump_memory: bool,

    /// Run the program in interactive mode
    #[clap(short, long, action = ArgAction::SetTrue)]
    interactive: bool,
}

fn parse_patch(s: &str) -> Result<(Address, Word), String> {
    let (address, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=WORD, got {s:?}"))?;
    let address = address
        .trim()
        .parse()
        .map_err(|e| format!("invalid address {address:?}: {e}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid word {value:?}: {e}"))?;
    Ok((address, value))
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = ?self.program, "Reading program");
        let source = fs::read_to_string(&self.program)?;

        debug!("Parsing program");
        let words = match parse_program(&source) {
            Ok(words) => words,
            Err(e) => report_parse_error(&source, &e),
        };

        // Without pre-supplied values, the read instruction prompts on the
        // console
        let input: Box<dyn Input> = if self.inputs.is_empty() {
            Box::new(Console)
        } else {
            Box::new(Queue::from(self.inputs.clone()))
        };

        let mut machine = Machine::with_io(words, input, Console);

        for &(address, value) in &self.patch {
            debug!(address, value, "Patching memory slot");
            machine.patch(address, value)?;
        }

        info!("Running program");
        if self.interactive {
            run_interactive(&mut machine);
        } else {
            machine.run()?;
        }

        info!(cycles = machine.cycles(), "End of program");

        if self.dump_memory {
            println!("{}", display_program(machine.memory().words()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_patch_test() {
        assert_eq!(parse_patch("1=12"), Ok((1, 12)));
        assert_eq!(parse_patch("0 = -7"), Ok((0, -7)));
        assert!(parse_patch("12").is_err());
        assert!(parse_patch("x=1").is_err());
        assert!(parse_patch("-1=2").is_err());
    }
}
