use std::fs;

use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use intcode_machine::constants::{Word, NOUN, RESULT, VERB};
use intcode_machine::{parse_program, Machine};
use tracing::{debug, info};

use crate::commands::report_parse_error;

#[derive(Parser, Debug)]
pub struct SearchOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    program: Utf8PathBuf,

    /// Value the result slot must reach
    #[clap(short, long)]
    target: Word,
}

impl SearchOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = ?self.program, "Reading program");
        let source = fs::read_to_string(&self.program)?;

        debug!("Parsing program");
        let words = match parse_program(&source) {
            Ok(words) => words,
            Err(e) => report_parse_error(&source, &e),
        };

        info!(target = self.target, "Scanning noun/verb pairs");
        for noun in 0..=99 {
            for verb in 0..=99 {
                let mut machine = Machine::new(words.clone());
                machine.patch(NOUN, noun)?;
                machine.patch(VERB, verb)?;

                // A faulted candidate is simply not the answer
                if let Err(e) = machine.run() {
                    debug!(noun, verb, error = %e, "Candidate faulted");
                    continue;
                }

                if machine.memory().get(RESULT)? == self.target {
                    info!(noun, verb, "Found a matching pair");
                    println!("noun = {noun}");
                    println!("verb = {verb}");
                    println!("answer = {}", 100 * noun + verb);
                    return Ok(());
                }
            }
        }

        anyhow::bail!("no noun/verb pair reached {}", self.target)
    }
}
