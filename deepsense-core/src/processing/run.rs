//! Per-request run context and cancellation.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::temp_files::{create_run_dir, generate_run_id};

use super::types::VideoReference;

/// Cooperative cancellation signal shared between a run and whoever may abort
/// it (a disconnecting client, a signal handler, a timeout).
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also reports cancellation once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// `Err(CoreError::Cancelled)` once the run should stop.
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Transient state of one analysis request. Dropping it removes the scratch
/// directory and everything extracted into it.
#[derive(Debug)]
pub struct PipelineRun {
    run_id: String,
    reference: VideoReference,
    scratch: TempDir,
}

impl PipelineRun {
    pub fn start(config: &CoreConfig, reference: VideoReference) -> CoreResult<Self> {
        let run_id = generate_run_id();
        let scratch = create_run_dir(config, &run_id)?;
        log::debug!(
            "Run {} scratch directory: {}",
            run_id,
            scratch.path().display()
        );
        Ok(Self {
            run_id,
            reference,
            scratch,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn reference(&self) -> &VideoReference {
        &self.reference
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(observer.check().is_ok());
        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(CoreError::Cancelled)));
    }

    #[test]
    fn test_elapsed_deadline_cancels() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        let token = CancelToken::with_timeout(Duration::from_secs(3600));
        assert!(!token.is_cancelled());
    }
}
