// ============================================================================
// deepsense-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console or File Logging for the CLI
//
// stdout is reserved for JSON responses, so console logs go to stderr through
// env_logger. When a log directory is given, records are written to a
// timestamped file through the log4rs setup in deepsense-core instead.
//
// USAGE:
// - RUST_LOG=info (default): Run milestones and skipped frames
// - RUST_LOG=debug / --verbose: ffmpeg commands and per-frame timings

use deepsense_core::logging::{get_timestamp, setup_file_logging};
use log::LevelFilter;
use std::path::{Path, PathBuf};

/// Log level selected by the `--verbose` flag.
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Path of the log file for this invocation inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("deepsense_{}.log", get_timestamp()))
}

/// Initializes logging. Returns the log file path when logging to a file.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Option<PathBuf> {
    let level = level_for(verbose);

    if let Some(dir) = log_dir {
        let path = log_file_path(dir);
        match setup_file_logging(&path, level) {
            Ok(()) => return Some(path),
            Err(e) => eprintln!("Failed to set up file logging in {}: {}", dir.display(), e),
        }
    }

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let path = log_file_path(Path::new("/var/log/deepsense"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("deepsense_"));
        assert!(name.ends_with(".log"));
        assert_eq!(path.parent(), Some(Path::new("/var/log/deepsense")));
    }

    #[test]
    fn test_verbose_level() {
        assert_eq!(level_for(true), LevelFilter::Debug);
        assert_eq!(level_for(false), LevelFilter::Info);
    }
}
