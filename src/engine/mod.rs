//! Command-line engine: argument parsing, handlers, shared tools.

pub mod arg_parser;
pub mod handlers;
pub mod tools;

pub use arg_parser::{Cli, Commands, ImportArgs};
pub use handlers::{handle_run, import};
