use std::fs;

use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use intcode_machine::{display_program, parse_program};
use tracing::{debug, info};

use crate::commands::report_parse_error;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    program: Utf8PathBuf,
}

impl DumpOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = ?self.program, "Reading program");
        let source = fs::read_to_string(&self.program)?;

        debug!("Parsing program");
        let words = match parse_program(&source) {
            Ok(words) => words,
            Err(e) => report_parse_error(&source, &e),
        };

        println!("{}", display_program(&words));

        Ok(())
    }
}
