// deepsense-core/src/mocks.rs

// --- Mocking Infrastructure (for testing) ---
//
// In-process stand-ins for every collaborator of the pipeline: the frame
// decoder, the inference backend, the record store, ffmpeg and ffprobe.
// They let the pipeline be exercised end to end without binaries, models or
// network access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use image::{Rgb, RgbImage};

use crate::error::{CoreError, CoreResult};
use crate::external::{ExtractionReport, ExtractionRequest, FrameDecoder, MediaProbe, MediaProber};
use crate::inference::{BackendKind, FrameContext, InferenceBackend, Prediction};
use crate::processing::preprocess::Tensor;
use crate::processing::run::CancelToken;
use crate::processing::sampler::sample_timestamps;
use crate::processing::types::VideoReference;
use crate::record::{VideoRecord, VideoStore};
use crate::temp_files::frame_path;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// FRAME DECODER
// ============================================================================

/// What the mock decoder leaves behind for one frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFrame {
    /// A valid PNG of the given size filled with one color
    Image { width: u32, height: u32, color: [u8; 3] },
    /// A file with the right name that is not an image
    Corrupt,
    /// No file at all
    Missing,
}

impl Default for MockFrame {
    fn default() -> Self {
        MockFrame::Image {
            width: 32,
            height: 18,
            color: [90, 120, 200],
        }
    }
}

/// `FrameDecoder` that writes synthetic frames.
#[derive(Debug)]
pub struct MockFrameDecoder {
    duration_secs: f64,
    plan: HashMap<usize, MockFrame>,
    failure: Option<String>,
    calls: AtomicUsize,
    scratch_dirs: Mutex<Vec<PathBuf>>,
}

impl Default for MockFrameDecoder {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            plan: HashMap::new(),
            failure: None,
            calls: AtomicUsize::new(0),
            scratch_dirs: Mutex::new(Vec::new()),
        }
    }
}

impl MockFrameDecoder {
    /// Decoder for a 60 second video whose every frame decodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that rejects every source with a `DecodeError`.
    pub fn unsupported(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    /// Overrides what is written for frame `index` (1-based).
    pub fn with_frame(mut self, index: usize, frame: MockFrame) -> Self {
        self.plan.insert(index, frame);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every output directory the decoder was asked to write into.
    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        lock(&self.scratch_dirs).clone()
    }
}

impl FrameDecoder for MockFrameDecoder {
    fn extract_frames(
        &self,
        reference: &VideoReference,
        request: &ExtractionRequest,
        out_dir: &Path,
    ) -> CoreResult<ExtractionReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.scratch_dirs).push(out_dir.to_path_buf());

        if let Some(reason) = &self.failure {
            return Err(CoreError::Decode(format!("{reference}: {reason}")));
        }

        let timestamps = sample_timestamps(self.duration_secs, request.count);
        for index in 1..=timestamps.len() {
            let path = frame_path(out_dir, index);
            match self.plan.get(&index).copied().unwrap_or_default() {
                MockFrame::Image { width, height, color } => {
                    RgbImage::from_pixel(width, height, Rgb(color))
                        .save(&path)
                        .map_err(|e| CoreError::Decode(format!("mock frame {index}: {e}")))?;
                }
                MockFrame::Corrupt => std::fs::write(&path, b"not a png")?,
                MockFrame::Missing => {}
            }
        }

        Ok(ExtractionReport {
            duration_secs: self.duration_secs,
            timestamps,
        })
    }
}

// ============================================================================
// INFERENCE BACKEND
// ============================================================================

/// Scripted outcome of one frame.
#[derive(Debug, Clone)]
pub enum Scripted {
    Predictions(Vec<Prediction>),
    Fail(String),
    IoFailure(String),
}

/// `InferenceBackend` answering from a per-frame script. Frames without a
/// script entry produce no predictions.
#[derive(Debug)]
pub struct ScriptedBackend {
    script: HashMap<usize, Scripted>,
    input_size: Option<u32>,
    concurrent: bool,
    call_delay: Duration,
    cancel_on: Option<(usize, CancelToken)>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    seen_frames: Mutex<Vec<usize>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            script: HashMap::new(),
            input_size: None,
            concurrent: true,
            call_delay: Duration::ZERO,
            cancel_on: None,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            seen_frames: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predictions returned for frame `index`.
    pub fn on_frame(mut self, index: usize, predictions: Vec<Prediction>) -> Self {
        self.script.insert(index, Scripted::Predictions(predictions));
        self
    }

    /// Frame `index` fails with an `InferenceError`.
    pub fn fail_frame(mut self, index: usize, reason: &str) -> Self {
        self.script.insert(index, Scripted::Fail(reason.to_string()));
        self
    }

    /// Frame `index` fails with an I/O error, which is not scoped to the frame.
    pub fn io_error_on(mut self, index: usize, reason: &str) -> Self {
        self.script.insert(index, Scripted::IoFailure(reason.to_string()));
        self
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = Some(size);
        self
    }

    /// Reports the backend as unsafe for concurrent calls.
    pub fn exclusive(mut self) -> Self {
        self.concurrent = false;
        self
    }

    /// Sleeps this long in every call, so overlapping calls can be observed.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Cancels `token` while frame `index` is being inferred.
    pub fn cancel_on(mut self, index: usize, token: CancelToken) -> Self {
        self.cancel_on = Some((index, token));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Frame indexes seen, in call order.
    pub fn seen_frames(&self) -> Vec<usize> {
        lock(&self.seen_frames).clone()
    }
}

impl InferenceBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Classify
    }

    fn input_size(&self) -> Option<u32> {
        self.input_size
    }

    fn supports_concurrent_calls(&self) -> bool {
        self.concurrent
    }

    fn predict(&self, _tensor: &Tensor, context: &FrameContext<'_>) -> CoreResult<Vec<Prediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen_frames).push(context.index);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.call_delay.is_zero() {
            thread::sleep(self.call_delay);
        }
        if let Some((index, token)) = &self.cancel_on {
            if *index == context.index {
                token.cancel();
            }
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        match self.script.get(&context.index) {
            Some(Scripted::Predictions(predictions)) => Ok(predictions.clone()),
            Some(Scripted::Fail(reason)) => Err(CoreError::Inference(reason.clone())),
            Some(Scripted::IoFailure(reason)) => {
                Err(CoreError::Io(std::io::Error::other(reason.clone())))
            }
            None => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// STORES
// ============================================================================

/// `VideoStore` keeping records in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<(String, VideoRecord)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<VideoRecord> {
        lock(&self.records).iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VideoStore for MemoryStore {
    fn create(&self, record: &VideoRecord) -> CoreResult<String> {
        let mut records = lock(&self.records);
        let id = format!("mem-{}", records.len() + 1);
        records.push((id.clone(), record.clone()));
        Ok(id)
    }
}

/// `VideoStore` that rejects every record.
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl VideoStore for FailingStore {
    fn create(&self, _record: &VideoRecord) -> CoreResult<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Persistence("store unavailable".to_string()))
    }
}

// ============================================================================
// FFPROBE
// ============================================================================

/// `MediaProber` returning a fixed probe or error.
#[derive(Debug)]
pub struct MockProber {
    result: Result<MediaProbe, String>,
}

impl MockProber {
    pub fn with_duration(duration_secs: f64) -> Self {
        Self {
            result: Ok(MediaProbe {
                duration_secs,
                width: Some(1280),
                height: Some(720),
            }),
        }
    }

    /// Prober failing like an unreachable source.
    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
        }
    }
}

impl MediaProber for MockProber {
    fn probe(&self, source: &str) -> CoreResult<MediaProbe> {
        match &self.result {
            Ok(probe) => Ok(probe.clone()),
            Err(reason) => Err(CoreError::Io(std::io::Error::other(format!(
                "{source}: {reason}"
            )))),
        }
    }
}

// ============================================================================
// FFMPEG
// ============================================================================

#[cfg(unix)]
pub use self::ffmpeg::{MockFfmpegProcess, MockFfmpegSpawner};

#[cfg(unix)]
mod ffmpeg {
    use std::collections::HashSet;
    use std::os::unix::process::ExitStatusExt;
    use std::path::PathBuf;
    use std::process::ExitStatus;
    use std::sync::{Arc, Mutex};

    use ffmpeg_sidecar::command::FfmpegCommand;
    use ffmpeg_sidecar::event::FfmpegEvent;
    use image::{Rgb, RgbImage};

    use super::lock;
    use crate::error::{CoreResult, command_start_error};
    use crate::external::{FfmpegProcess, FfmpegSpawner};

    /// Process replaying a fixed list of events.
    pub struct MockFfmpegProcess {
        events: Vec<FfmpegEvent>,
        exit_status: ExitStatus,
    }

    impl FfmpegProcess for MockFfmpegProcess {
        fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
        where
            F: FnMut(FfmpegEvent) -> CoreResult<()>,
        {
            for event in self.events.drain(..) {
                handler(event)?;
            }
            Ok(())
        }

        fn wait(&mut self) -> CoreResult<ExitStatus> {
            Ok(self.exit_status)
        }
    }

    /// Spawner that records the arguments of every command and writes a
    /// small PNG at the command's output path. Clones share the call log.
    #[derive(Debug, Default, Clone)]
    pub struct MockFfmpegSpawner {
        received_calls: Arc<Mutex<Vec<Vec<String>>>>,
        failing_calls: HashSet<usize>,
        missing_binary: bool,
    }

    impl MockFfmpegSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        /// The `call`-th command (1-based) exits with status 1 and writes nothing.
        pub fn fail_call(mut self, call: usize) -> Self {
            self.failing_calls.insert(call);
            self
        }

        /// Every spawn fails as if ffmpeg were not installed.
        pub fn missing_binary() -> Self {
            Self {
                missing_binary: true,
                ..Self::default()
            }
        }

        pub fn get_received_calls(&self) -> Vec<Vec<String>> {
            lock(&self.received_calls).clone()
        }
    }

    impl FfmpegSpawner for MockFfmpegSpawner {
        type Process = MockFfmpegProcess;

        fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
            let args: Vec<String> = cmd
                .as_inner()
                .get_args()
                .map(|s| s.to_string_lossy().into_owned())
                .collect();
            let call = {
                let mut calls = lock(&self.received_calls);
                calls.push(args.clone());
                calls.len()
            };

            if self.missing_binary {
                return Err(command_start_error(
                    "ffmpeg (sidecar)",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
                ));
            }

            if self.failing_calls.contains(&call) {
                log::warn!("MockFfmpegSpawner simulating failure of call {}", call);
                return Ok(MockFfmpegProcess {
                    events: vec![FfmpegEvent::Error(
                        "Invalid data found when processing input".into(),
                    )],
                    exit_status: ExitStatus::from_raw(256),
                });
            }

            if let Some(output) = args.last() {
                let output = PathBuf::from(output);
                if let Err(e) = RgbImage::from_pixel(16, 9, Rgb([10, 200, 30])).save(&output) {
                    log::error!("MockFfmpegSpawner failed to write {:?}: {}", output, e);
                }
            }

            Ok(MockFfmpegProcess {
                events: Vec::new(),
                exit_status: ExitStatus::from_raw(0),
            })
        }
    }
}
