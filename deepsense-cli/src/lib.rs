// deepsense-cli/src/lib.rs
//
// Library portion of the DeepSense CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

// Re-export items needed by the binary or integration tests
pub use cli::{AnalyzeArgs, AskArgs, Cli, Commands};
pub use commands::analyze::run_analyze;
pub use commands::ask::run_ask;
pub use commands::check::run_check;
