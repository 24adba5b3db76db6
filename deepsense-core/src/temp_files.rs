//! Temporary file management utilities.
//!
//! Every pipeline run extracts its frames into its own scratch directory. The
//! directory is a `tempfile::TempDir`, so it is removed recursively when the
//! owning run is dropped, whichever way the run ends.

use crate::config::CoreConfig;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};

/// Prefix of every per-run scratch directory.
pub const RUN_DIR_PREFIX: &str = "deepsense-run-";

/// Base directory for scratch directories: the configured `temp_dir` or the
/// system temp directory.
pub fn temp_base_dir(config: &CoreConfig) -> PathBuf {
    config.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
}

/// Creates a uniquely named scratch directory for one run. Auto-cleaned when dropped.
pub fn create_run_dir(config: &CoreConfig, run_id: &str) -> CoreResult<TempDir> {
    let base = temp_base_dir(config);
    std::fs::create_dir_all(&base)?;

    Ok(TempFileBuilder::new()
        .prefix(&format!("{RUN_DIR_PREFIX}{run_id}-"))
        .tempdir_in(base)?)
}

/// Path of the `index`-th extracted frame (1-based) inside a scratch directory.
pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame-{index}.png"))
}

/// Returns a random alphanumeric identifier used to tag runs in logs and
/// scratch directory names.
pub fn generate_run_id() -> String {
    use rand::distributions::Alphanumeric;
    use rand::{Rng, thread_rng};

    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            temp_dir: Some(base.path().to_path_buf()),
            ..Default::default()
        };

        let run_dir = create_run_dir(&config, "abc").unwrap();
        let path = run_dir.path().to_path_buf();
        std::fs::write(frame_path(&path, 1), b"frame").unwrap();
        assert!(path.exists());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("deepsense-run-abc-")
        );

        drop(run_dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_frame_path_naming() {
        let dir = Path::new("/scratch");
        assert_eq!(frame_path(dir, 3), PathBuf::from("/scratch/frame-3.png"));
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
