use std::process::exit;

use intcode_machine::ParseError;

mod completion;
mod dump;
mod run;
mod search;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Load and run a program
    Run(self::run::RunOpt),

    /// Brute-force the two patch slots until the result slot reaches a target
    Search(self::search::SearchOpt),

    /// Parse a program and print it back in load format
    Dump(self::dump::DumpOpt),

    /// Generate shell completion scripts
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Subcommand::Run(opt) => opt.exec(),
            Subcommand::Search(opt) => opt.exec(),
            Subcommand::Dump(opt) => opt.exec(),
            Subcommand::Completion(opt) => opt.exec(),
        }
    }
}

/// Render a load error as a labeled report pointing at the offending token
pub(crate) fn report_parse_error(source: &str, error: &ParseError) -> ! {
    let end = error.offset + error.token.len().max(1);
    let labels = vec![miette::LabeledSpan::at(
        error.offset..end,
        "malformed token",
    )];
    let report = miette::miette!(labels = labels, "Failed to parse program")
        .with_source_code(source.to_string());
    eprintln!("{report:?}");
    exit(1);
}
