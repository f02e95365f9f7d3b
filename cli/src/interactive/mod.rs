//! This module implements the TTY interactive interface.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editing logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use std::collections::HashSet;

use clap::Parser;
use intcode_machine::constants::{Address, Word};
use intcode_machine::runtime::io::{Input, Output};
use intcode_machine::runtime::Instruction;
use intcode_machine::{Machine, State};
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
use self::helper::RunHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
    allow_negative_numbers = true,
)]
/// Interactive mode commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of steps to execute
        #[clap(value_parser, default_value = "1")]
        number: u64,
    },

    /// Exit the machine
    Exit,

    /// Show the content of a block in memory
    Memory {
        /// The address to show
        #[clap(value_parser)]
        address: Address,

        /// Number of memory cells to show
        #[clap(value_parser, default_value = "1")]
        number: Address,
    },

    /// Set a value in memory
    Set {
        /// The address to set
        #[clap(value_parser)]
        address: Address,

        /// The value to set
        #[clap(value_parser)]
        value: Word,
    },

    /// Show the next few instructions
    List {
        /// Number of instructions to show
        #[clap(value_parser, default_value = "10")]
        number: usize,
    },

    /// Set a breakpoint
    Break {
        /// The address where to set the breakpoint
        #[clap(value_parser)]
        address: Address,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The address of the breakpoint to remove
        #[clap(value_parser)]
        address: Address,
    },

    /// Continue the program until the next breakpoint or halt
    Continue,

    /// Show informations about the current debugging session
    Info {
        #[clap(subcommand)]
        sub: Option<InfoCommand>,
    },
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,

    /// Show the number of instructions executed since the beginning
    Cycles,
}

/// Holds informations about a interactive session
#[derive(Debug, Default)]
struct Session {
    /// List of active breakpoints
    breakpoints: HashSet<Address>,
}

impl Session {
    /// Add a breakpoint
    fn add_breakpoint(&mut self, address: Address) {
        if self.breakpoints.insert(address) {
            info!(address, "Setting a breakpoint");
        } else {
            warn!(address, "A breakpoint was already set");
        }
    }

    /// Remove a breakpoint
    fn remove_breakpoint(&mut self, address: Address) {
        if self.breakpoints.remove(&address) {
            info!(address, "Removing breakpoint");
        } else {
            warn!(address, "No breakpoint was set here");
        }
    }

    /// Checks if the given address has a breakpoint
    fn has_breakpoint(&self, address: Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Display the list of breakpoints
    fn display_breakpoints<I: Input, O: Output>(&self, machine: &Machine<I, O>) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{} breakpoints:", x),
        }

        // This might be an unnecessary copy, but we want them to be sorted by
        // address for readability
        let mut bp: Vec<_> = self.breakpoints.iter().copied().collect();
        bp.sort_unstable();
        for addr in bp {
            self.display_word(machine, addr);
        }
    }

    /// Display the memory word at an address, decoded when it decodes
    fn display_word<I: Input, O: Output>(&self, machine: &Machine<I, O>, address: Address) {
        // Compute what is supposed to show in the gutter
        let is_current_line = machine.pc() == address;
        let has_breakpoint = self.has_breakpoint(address);

        let gutter = match (has_breakpoint, is_current_line) {
            (true, true) => "B>",
            (true, false) => "B ",
            (false, true) => " >",
            (false, false) => "  ",
        };

        let word = machine.memory().get(address).ok();
        let instruction = word.and_then(|w| Instruction::decode(w).ok());

        match (word, instruction) {
            (Some(w), Some(instruction)) => {
                info!("{:<2} {:>5}    {}  ({})", gutter, address, instruction, w);
            }
            (Some(w), None) => info!("{:<2} {:>5}    {}", gutter, address, w),
            (None, _) => info!("{:<2} {:>5}    –", gutter, address),
        }
    }

    /// Display the number of instructions executed
    fn display_cycles<I: Input, O: Output>(machine: &Machine<I, O>) {
        info!("Cycles: {}", machine.cycles());
    }
}

#[allow(clippy::too_many_lines)]
pub(crate) fn run_interactive<I: Input, O: Output>(machine: &mut Machine<I, O>) {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let mut session = Session::default();

    let h: RunHelper<Command> = RunHelper::new();
    let mut rl: Editor<RunHelper<Command>, DefaultHistory> =
        Editor::with_config(config).expect("Initialize terminal input");
    rl.set_helper(Some(h));

    let mut last_command: Option<Command> = None;
    let mut halted = machine.state() == State::Halted;

    'read: loop {
        // A macro to unwrap an error, log it and continue the loop
        macro_rules! warn_and_continue {
            ($e:expr) => {
                match $e {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!(error = %e);
                        continue 'read;
                    }
                }
            };
        }

        // A macro to run one step, flagging the machine as stopped on halt
        // or fault
        macro_rules! step_or_continue {
            () => {
                match machine.step() {
                    Ok(State::Running) => {}
                    Ok(State::Halted) => {
                        info!("Machine halted");
                        halted = true;
                        continue 'read;
                    }
                    Err(e) => {
                        warn!(error = &e as &dyn std::error::Error, "Faulted");
                        halted = true;
                        continue 'read;
                    }
                }
            };
        }

        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return;
        };

        let command = if readline.is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = warn_and_continue!(Command::try_parse_from(words));
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        match (command, halted) {
            (Command::Exit, _) => break,

            (Command::Step { number }, false) => {
                for _ in 0..number {
                    step_or_continue!();
                }
            }

            (Command::Memory { address, number }, _) => {
                for i in 0..number {
                    let address = address + i;
                    let value = warn_and_continue!(machine.memory().get(address));
                    info!(address, value);
                }
            }

            (Command::Set { address, value }, false) => {
                info!("Setting memory at address {address} to {value}");
                warn_and_continue!(machine.patch(address, value));
            }

            (Command::List { number }, _) => {
                let mut address = machine.pc();
                for _ in 0..number {
                    session.display_word(machine, address);
                    let Some(width) = machine
                        .memory()
                        .get(address)
                        .ok()
                        .and_then(|w| Instruction::decode(w).ok())
                        .map(|instruction| instruction.opcode.width())
                    else {
                        break;
                    };
                    address += width;
                }
            }

            (Command::Break { address }, false) => {
                session.add_breakpoint(address);
            }

            (Command::Unbreak { address }, false) => {
                session.remove_breakpoint(address);
            }

            (Command::Continue, false) => loop {
                step_or_continue!();

                if session.has_breakpoint(machine.pc()) {
                    info!(address = machine.pc(), "Stopped at a breakpoint");
                    break;
                }
            },

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => {
                    session.display_breakpoints(machine);
                }
                Some(InfoCommand::Cycles) => {
                    Session::display_cycles(machine);
                }
                None => {
                    session.display_breakpoints(machine);
                    info!("–");
                    Session::display_cycles(machine);
                    info!(pc = machine.pc(), state = ?machine.state(), "Machine state");
                }
            },

            (_, true) => {
                // The machine is halted but the user asked to continue, we
                // just warn
                warn!("Machine is halted. Use \"exit\" to quit");
            }
        }
    }
}
