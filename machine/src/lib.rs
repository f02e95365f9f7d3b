pub mod constants;
pub mod parser;
pub mod runtime;

pub use self::parser::{display_program, parse_program, ParseError};
pub use self::runtime::{Machine, RuntimeError, State};
