// ============================================================================
// deepsense-core/src/processing/pipeline.rs
// ============================================================================
//
// ANALYSIS PIPELINE: Orchestration of One Request
//
// Stages run in sequence for each request:
//
//   validate -> sample -> (preprocess -> infer) per frame -> aggregate
//            -> build record -> persist
//
// The per-frame stage runs on a bounded rayon pool owned by the pipeline;
// results are collected back in frame order so aggregation sees the same
// sequence regardless of scheduling. A frame that fails preprocessing or
// inference is skipped. Any other error aborts the run, and a cancelled run
// stops at the next checkpoint; neither persists anything. The run's scratch
// directory is removed on every exit path when the PipelineRun is dropped.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::api::AnalyzeRequest;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegFrameDecoder, FrameDecoder};
use crate::inference::{EngineLoader, FrameContext, InferenceEngine, Prediction};
use crate::record::{JsonLinesStore, VideoStore, build_record};
use crate::utils::format_duration;

use super::aggregate::{AnalysisResult, aggregate};
use super::preprocess::Preprocessor;
use super::run::{CancelToken, PipelineRun};
use super::sampler::FrameSampler;
use super::types::{Frame, VideoReference};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    /// Identifier returned by the store
    pub record_id: String,
    pub url: String,
    pub analysis: AnalysisResult,
    /// Frames loaded from the video
    pub frames_sampled: usize,
    /// Frames whose predictions reached the aggregator
    pub frames_analyzed: usize,
    /// Frames dropped by preprocessing or inference
    pub frames_skipped: usize,
}

/// The analysis pipeline with its collaborators.
pub struct AnalysisPipeline {
    config: CoreConfig,
    sampler: FrameSampler,
    preprocessor: Preprocessor,
    engine: Arc<InferenceEngine>,
    store: Arc<dyn VideoStore>,
    pool: ThreadPool,
}

impl AnalysisPipeline {
    pub fn new(
        config: CoreConfig,
        decoder: Arc<dyn FrameDecoder>,
        engine: Arc<InferenceEngine>,
        store: Arc<dyn VideoStore>,
    ) -> CoreResult<Self> {
        if config.sample_count == 0 {
            return Err(CoreError::Config("sample_count must be at least 1".into()));
        }

        let workers = config.effective_workers();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("deepsense-worker-{i}"))
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to build worker pool: {e}")))?;

        let input_size = engine.input_size().unwrap_or(config.backend.input_size);
        log::debug!(
            "Pipeline ready: {} frames per video, {} workers, {}x{} input, {} backend",
            config.sample_count,
            workers,
            input_size,
            input_size,
            engine.kind()
        );

        Ok(Self {
            sampler: FrameSampler::new(decoder, config.sample_count, config.frame_width),
            preprocessor: Preprocessor::new(input_size),
            config,
            engine,
            store,
            pool,
        })
    }

    /// Pipeline using ffmpeg for decoding, the engine from `loader` and a
    /// JSON-lines store at `config.store_path`.
    pub fn with_defaults(config: CoreConfig, loader: &EngineLoader) -> CoreResult<Self> {
        config.validate()?;
        let engine = loader.get_or_load(&config.backend, config.serialize_inference)?;
        let store = Arc::new(JsonLinesStore::new(config.store_path.clone()));
        Self::new(
            config,
            Arc::new(FfmpegFrameDecoder::system()),
            engine,
            store,
        )
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Validates `request` and analyzes the referenced video.
    ///
    /// Validation happens before any collaborator is touched.
    pub fn analyze(
        &self,
        request: &AnalyzeRequest,
        cancel: &CancelToken,
    ) -> CoreResult<AnalysisOutcome> {
        let reference = request.validate()?;
        self.analyze_reference(reference, cancel)
    }

    /// Runs every stage for an already validated reference.
    pub fn analyze_reference(
        &self,
        reference: VideoReference,
        cancel: &CancelToken,
    ) -> CoreResult<AnalysisOutcome> {
        cancel.check()?;
        let started = Instant::now();
        let run = PipelineRun::start(&self.config, reference)?;
        log::info!("Run {}: analyzing {}", run.run_id(), run.reference());

        let frames = self
            .sampler
            .sample(run.reference(), run.scratch_dir())
            .inspect_err(|e| log::error!("Run {}: sampling failed: {}", run.run_id(), e))?;
        let frames_sampled = frames.len();
        if frames_sampled == 0 {
            log::warn!("Run {}: no frames could be sampled", run.run_id());
        }

        let per_frame: Vec<CoreResult<Vec<Prediction>>> = self.pool.install(|| {
            frames
                .into_par_iter()
                .map(|frame| self.process_frame(frame, run.reference(), cancel))
                .collect()
        });

        let mut predictions = Vec::new();
        let mut frames_analyzed = 0usize;
        for result in per_frame {
            match result {
                Ok(frame_predictions) => {
                    frames_analyzed += 1;
                    predictions.extend(frame_predictions);
                }
                Err(CoreError::Cancelled) => {
                    log::info!("Run {}: cancelled during inference", run.run_id());
                    return Err(CoreError::Cancelled);
                }
                Err(e) if e.is_frame_scoped() => {
                    log::warn!("Run {}: skipping frame: {}", run.run_id(), e)
                }
                Err(e) => {
                    log::error!("Run {}: aborting: {}", run.run_id(), e);
                    return Err(e);
                }
            }
        }
        let frames_skipped = frames_sampled - frames_analyzed;

        cancel.check()?;
        let analysis = aggregate(&predictions, self.config.confidence_policy);
        log::info!("Run {}: {}", run.run_id(), analysis.summary);

        cancel.check()?;
        let record = build_record(run.reference(), analysis);
        let record_id = self.store.create(&record).inspect_err(|e| {
            log::error!(
                "Run {}: analysis of {} was not persisted ({}); result: {}",
                run.run_id(),
                record.url,
                e,
                serde_json::to_string(&record.analysis).unwrap_or_default()
            )
        })?;

        log::info!(
            "Run {}: stored as {} after {} ({} of {} frames analyzed)",
            run.run_id(),
            record_id,
            format_duration(started.elapsed().as_secs_f64()),
            frames_analyzed,
            frames_sampled
        );

        Ok(AnalysisOutcome {
            record_id,
            url: record.url,
            analysis: record.analysis,
            frames_sampled,
            frames_analyzed,
            frames_skipped,
        })
    }

    fn process_frame(
        &self,
        frame: Frame,
        reference: &VideoReference,
        cancel: &CancelToken,
    ) -> CoreResult<Vec<Prediction>> {
        cancel.check()?;
        let index = frame.index;
        let timestamp_secs = frame.timestamp_secs;
        let tensor = self.preprocessor.preprocess(frame)?;
        let context = FrameContext {
            reference,
            index,
            timestamp_secs,
        };
        self.engine.infer(&tensor, &context)
    }
}
