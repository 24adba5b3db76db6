//! Implementation of the 'check' subcommand.

use crate::error::CliResult;

use deepsense_core::{CoreError, check_dependency};

/// External tools the frame sampler shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Checks every required tool and prints one status line per tool.
///
/// Fails with the first missing dependency after all tools were checked.
pub fn run_check() -> CliResult<()> {
    let mut first_error: Option<CoreError> = None;

    for tool in REQUIRED_TOOLS {
        match check_dependency(tool) {
            Ok(()) => println!("{tool}: ok"),
            Err(e) => {
                println!("{tool}: missing ({e})");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
