// ============================================================================
// deepsense-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Exit codes and error output
//
// Every command failure is printed to stdout as an ErrorResponse JSON object
// and turned into a process exit code based on the error kind.

use deepsense_core::{CoreError, CoreResult, ErrorResponse};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Exit code for a successful command.
pub const EXIT_OK: i32 = 0;

/// Exit code for failures other than validation and cancellation.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for rejected input.
pub const EXIT_VALIDATION: i32 = 2;

/// Exit code for runs abandoned by cancellation or timeout.
pub const EXIT_CANCELLED: i32 = 3;

/// Maps an error to the process exit code.
pub fn exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::Validation(_) => EXIT_VALIDATION,
        CoreError::Cancelled => EXIT_CANCELLED,
        _ => EXIT_FAILURE,
    }
}

/// Serializes the error as `{"error": kind, "details": message}`.
pub fn error_json(err: &CoreError) -> String {
    serde_json::to_string(&ErrorResponse::from(err))
        .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", err.kind()))
}
