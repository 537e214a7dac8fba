//! Demo binary support: argument parsing, run handler, progress display.

pub mod arg_parser;
pub mod cli;
pub mod progress;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{handle_run, setup_config};
