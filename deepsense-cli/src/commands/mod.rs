//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Module containing the implementation of the `analyze` command.
/// This command samples, labels and summarizes a single video.
pub mod analyze;

pub mod ask;
pub mod check;
