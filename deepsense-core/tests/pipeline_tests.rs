// deepsense-core/tests/pipeline_tests.rs

use deepsense_core::mocks::{
    FailingStore, MemoryStore, MockFrame, MockFrameDecoder, ScriptedBackend,
};
use deepsense_core::record::VideoStore;
use deepsense_core::{
    AnalysisPipeline, AnalyzeRequest, CancelToken, CoreConfig, CoreError, InferenceEngine,
    Prediction,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const URL: &str = "https://cdn.example.com/videos/pets.mp4";

// --- Test Helper Functions ---

fn config_in(base: &Path) -> CoreConfig {
    CoreConfig {
        temp_dir: Some(base.to_path_buf()),
        sample_count: 5,
        worker_threads: 3,
        ..Default::default()
    }
}

fn build(
    config: CoreConfig,
    decoder: &Arc<MockFrameDecoder>,
    backend: &Arc<ScriptedBackend>,
    store: Arc<dyn VideoStore>,
) -> AnalysisPipeline {
    let engine = InferenceEngine::new(Box::new(backend.clone()), config.serialize_inference);
    AnalysisPipeline::new(config, decoder.clone(), Arc::new(engine), store).unwrap()
}

fn assert_no_scratch_left(base: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(base).unwrap().collect();
    assert!(leftovers.is_empty(), "scratch files left behind: {:?}", leftovers);
}

fn pets_backend() -> ScriptedBackend {
    ScriptedBackend::new()
        .on_frame(1, vec![Prediction::new("cat", 0.9)])
        .on_frame(2, vec![Prediction::new("dog", 0.5)])
        .on_frame(3, vec![Prediction::new("cat", 0.7)])
}

// --- Tests ---

#[test]
fn test_successful_run_is_persisted() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(pets_backend());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let outcome = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.analysis.summary, "Video contains 2 cat(s), 1 dog(s)");
    assert_eq!(outcome.analysis.detected_objects[0].confidence, 90);
    assert_eq!(outcome.frames_sampled, 5);
    assert_eq!(outcome.frames_analyzed, 5);
    assert_eq!(outcome.frames_skipped, 0);
    assert_eq!(backend.calls(), 5);

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, URL);
    assert_eq!(records[0].analysis, outcome.analysis);
    assert_eq!(outcome.record_id, "mem-1");

    assert_no_scratch_left(base.path());
}

#[test]
fn test_missing_videourl_never_reaches_sampler() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    for request in [AnalyzeRequest::default(), AnalyzeRequest::new("  ")] {
        let err = pipeline.analyze(&request, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "videourl is required");
    }

    assert_eq!(decoder.calls(), 0);
    assert_eq!(backend.calls(), 0);
    assert!(store.is_empty());
    assert_no_scratch_left(base.path());
}

#[test]
fn test_zero_frames_is_an_empty_analysis() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new().with_duration(0.0));
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let outcome = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap();

    assert!(outcome.analysis.detected_objects.is_empty());
    assert_eq!(outcome.analysis.summary, "No objects detected in video");
    assert_eq!(outcome.frames_sampled, 0);
    assert_eq!(decoder.calls(), 1);
    assert_eq!(backend.calls(), 0);
    assert_eq!(store.len(), 1);
    assert_no_scratch_left(base.path());
}

#[test]
fn test_unsupported_video_is_a_decode_error() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::unsupported("unsupported codec"));
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let err = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap_err();

    assert_eq!(err.kind(), "decode");
    assert!(err.to_string().contains("unsupported codec"));
    assert_eq!(backend.calls(), 0);
    assert!(store.is_empty());
    assert_no_scratch_left(base.path());
}

#[test]
fn test_bad_frames_are_skipped() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(
        MockFrameDecoder::new()
            .with_frame(2, MockFrame::Corrupt)
            .with_frame(3, MockFrame::Missing),
    );
    let backend = Arc::new(
        ScriptedBackend::new()
            .on_frame(1, vec![Prediction::new("cat", 0.9)])
            .fail_frame(4, "backend rejected input")
            .on_frame(5, vec![Prediction::new("cat", 0.6), Prediction::new("bowl", 0.3)]),
    );
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let outcome = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.frames_sampled, 3);
    assert_eq!(outcome.frames_analyzed, 2);
    assert_eq!(outcome.frames_skipped, 1);
    assert_eq!(outcome.analysis.summary, "Video contains 2 cat(s), 1 bowl(s)");

    let mut seen = backend.seen_frames();
    seen.sort();
    assert_eq!(seen, vec![1, 4, 5]);
    assert_eq!(store.len(), 1);
    assert_no_scratch_left(base.path());
}

#[test]
fn test_cancelled_before_start() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let token = CancelToken::new();
    token.cancel();
    let err = pipeline.analyze(&AnalyzeRequest::new(URL), &token).unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    assert_eq!(decoder.calls(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_cancelled_mid_run_persists_nothing() {
    let base = tempdir().unwrap();
    let token = CancelToken::new();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(pets_backend().cancel_on(2, token.clone()));
    let store = Arc::new(MemoryStore::new());
    let config = CoreConfig {
        worker_threads: 1,
        ..config_in(base.path())
    };
    let pipeline = build(config, &decoder, &backend, store.clone());

    let err = pipeline.analyze(&AnalyzeRequest::new(URL), &token).unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    assert!(backend.calls() < 5);
    assert!(store.is_empty());
    assert_no_scratch_left(base.path());
}

#[test]
fn test_elapsed_timeout_cancels() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let token = CancelToken::with_timeout(Duration::ZERO);
    let err = pipeline.analyze(&AnalyzeRequest::new(URL), &token).unwrap_err();
    assert_eq!(err.kind(), "cancelled");
    assert!(store.is_empty());
}

#[test]
fn test_persistence_failure_is_fatal() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(pets_backend());
    let store = Arc::new(FailingStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let err = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, CoreError::Persistence(_)));
    assert_eq!(store.attempts(), 1);
    assert_eq!(backend.calls(), 5);
    assert_no_scratch_left(base.path());
}

#[test]
fn test_frame_order_survives_parallel_inference() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_call_delay(Duration::from_millis(10))
            .on_frame(1, vec![Prediction::new("alpha", 0.1)])
            .on_frame(2, vec![Prediction::new("bravo", 0.2)])
            .on_frame(3, vec![Prediction::new("charlie", 0.3)])
            .on_frame(4, vec![Prediction::new("alpha", 0.4)])
            .on_frame(5, vec![Prediction::new("delta", 0.5)]),
    );
    let store = Arc::new(MemoryStore::new());
    let config = CoreConfig {
        worker_threads: 5,
        ..config_in(base.path())
    };
    let pipeline = build(config, &decoder, &backend, store);

    let outcome = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap();

    let names: Vec<&str> = outcome
        .analysis
        .detected_objects
        .iter()
        .map(|o| o.name.as_str())
        .collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie", "delta"]);
    assert_eq!(outcome.analysis.detected_objects[0].confidence, 10);
}

#[test]
fn test_exclusive_backend_is_serialized() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(
        ScriptedBackend::new()
            .exclusive()
            .with_call_delay(Duration::from_millis(20)),
    );
    let store = Arc::new(MemoryStore::new());
    let config = CoreConfig {
        worker_threads: 5,
        ..config_in(base.path())
    };
    let pipeline = build(config, &decoder, &backend, store);

    pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap();

    assert_eq!(backend.calls(), 5);
    assert_eq!(backend.max_concurrent_calls(), 1);
}

#[test]
fn test_concurrent_runs_use_separate_scratch_dirs() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(pets_backend());
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    std::thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                pipeline
                    .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
                    .unwrap();
            });
        }
    });

    let mut dirs = decoder.scratch_dirs();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 3);
    assert_eq!(store.len(), 3);
    assert_no_scratch_left(base.path());
}

#[test]
fn test_non_frame_error_aborts_the_run() {
    let base = tempdir().unwrap();
    let decoder = Arc::new(MockFrameDecoder::new());
    let backend = Arc::new(
        pets_backend()
            .fail_frame(4, "backend rejected input")
            .io_error_on(5, "model file vanished"),
    );
    let store = Arc::new(MemoryStore::new());
    let pipeline = build(config_in(base.path()), &decoder, &backend, store.clone());

    let err = pipeline
        .analyze(&AnalyzeRequest::new(URL), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, CoreError::Io(_)));
    assert!(err.to_string().contains("model file vanished"));
    assert!(store.is_empty());
    assert_no_scratch_left(base.path());
}
