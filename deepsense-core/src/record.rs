// ============================================================================
// deepsense-core/src/record.rs
// ============================================================================
//
// RESULT BUILDER AND PERSISTENCE
//
// A finished analysis is packaged together with the reference it came from
// and a UTC creation time, then handed to a VideoStore. Stores are
// create-only: records are never updated or deleted through this crate.
//
// KEY COMPONENTS:
// - VideoRecord / build_record: the persistable document
// - VideoStore: the persistence collaborator
// - JsonLinesStore: default store, one JSON document per line

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::processing::aggregate::AnalysisResult;
use crate::processing::types::VideoReference;
use crate::temp_files::generate_run_id;

/// Persisted outcome of one analyzed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub url: String,
    pub analysis: AnalysisResult,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Packages `analysis` for persistence, stamped with the current time.
pub fn build_record(reference: &VideoReference, analysis: AnalysisResult) -> VideoRecord {
    VideoRecord {
        url: reference.as_str().to_string(),
        analysis,
        created_at: Utc::now(),
    }
}

/// Create-only persistence collaborator.
pub trait VideoStore: Send + Sync {
    /// Stores `record` and returns the identifier it was stored under.
    fn create(&self, record: &VideoRecord) -> CoreResult<String>;
}

#[derive(Serialize)]
struct StoredLine<'a> {
    id: &'a str,
    #[serde(flatten)]
    record: &'a VideoRecord,
}

/// Appends records to a JSON-lines file, creating it on first use.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()
    }
}

impl VideoStore for JsonLinesStore {
    fn create(&self, record: &VideoRecord) -> CoreResult<String> {
        let id = format!("{}-{}", record.created_at.format("%Y%m%d%H%M%S"), generate_run_id());
        let line = serde_json::to_string(&StoredLine { id: &id, record })
            .map_err(|e| CoreError::Persistence(format!("serializing record: {e}")))?;

        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::Persistence("store lock poisoned".into()))?;
        self.append(&line).map_err(|e| {
            CoreError::Persistence(format!("writing {}: {}", self.path.display(), e))
        })?;

        log::debug!("Stored record {} in {}", id, self.path.display());
        Ok(id)
    }
}
