// deepsense-core/tests/test_env_vars.rs
//
// Environment variables are process-wide, so every variable is exercised in
// a single test to avoid races between parallel test threads.

use deepsense_core::{BackendKind, CoreConfig};
use std::path::PathBuf;

const VARS: &[(&str, &str)] = &[
    ("DEEPSENSE_TEMP_DIR", "/var/tmp/deepsense"),
    ("DEEPSENSE_SAMPLE_COUNT", "9"),
    ("DEEPSENSE_FRAME_WIDTH", "480"),
    ("DEEPSENSE_WORKERS", "2"),
    ("DEEPSENSE_SERIALIZE_INFERENCE", "true"),
    ("DEEPSENSE_RUN_TIMEOUT", "45"),
    ("DEEPSENSE_STORE_PATH", "/data/videos.jsonl"),
    ("DEEPSENSE_BACKEND", "text-generation"),
    ("DEEPSENSE_ENDPOINT", "https://api.example.com/v1"),
    ("GEMINI_API_KEY", "key-from-env"),
];

#[test]
fn test_env_overrides() {
    for (key, value) in VARS {
        unsafe { std::env::set_var(key, value) };
    }
    unsafe { std::env::set_var("DEEPSENSE_MODEL_PATH", "") };

    let mut config = CoreConfig::default();
    config.apply_env_overrides();

    for (key, _) in VARS {
        unsafe { std::env::remove_var(key) };
    }
    unsafe { std::env::remove_var("DEEPSENSE_MODEL_PATH") };

    assert_eq!(config.temp_dir, Some(PathBuf::from("/var/tmp/deepsense")));
    assert_eq!(config.sample_count, 9);
    assert_eq!(config.frame_width, 480);
    assert_eq!(config.worker_threads, 2);
    assert!(config.serialize_inference);
    assert_eq!(config.run_timeout_secs, Some(45));
    assert_eq!(config.store_path, PathBuf::from("/data/videos.jsonl"));
    assert_eq!(config.backend.kind, BackendKind::TextGeneration);
    assert_eq!(config.backend.endpoint.as_deref(), Some("https://api.example.com/v1"));
    assert_eq!(config.backend.api_key.as_deref(), Some("key-from-env"));
    // empty values count as unset
    assert_eq!(config.backend.model_path, None);
    assert!(config.validate().is_ok());
}
