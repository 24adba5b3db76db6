use assert_cmd::Command;
use predicates::str::contains;
use std::error::Error;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary with a clean environment
fn deepsense_cmd() -> Command {
    let mut cmd = Command::cargo_bin("deepsense").expect("Failed to find deepsense binary");
    for key in [
        "DEEPSENSE_CONFIG",
        "DEEPSENSE_BACKEND",
        "DEEPSENSE_MODEL_PATH",
        "DEEPSENSE_ENDPOINT",
        "DEEPSENSE_STORE_PATH",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    deepsense_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("analyze"))
        .stdout(contains("ask"))
        .stdout(contains("check"));
}

#[test]
fn test_analyze_without_url_is_rejected() {
    deepsense_cmd()
        .arg("analyze")
        .assert()
        .code(2)
        .stdout(contains(r#""error":"validation""#))
        .stdout(contains("videourl is required"));
}

#[test]
fn test_analyze_blank_url_is_rejected() {
    deepsense_cmd()
        .args(["analyze", "--url", "   "])
        .assert()
        .code(2)
        .stdout(contains("videourl is required"));
}

#[test]
fn test_request_file_without_videourl() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let request = dir.path().join("request.json");
    std::fs::write(&request, "{}")?;

    deepsense_cmd()
        .arg("analyze")
        .arg("--request")
        .arg(&request)
        .assert()
        .code(2)
        .stdout(contains("videourl is required"));

    // Nothing was persisted for a rejected request
    assert!(!dir.path().join("deepsense-videos.jsonl").exists());
    Ok(())
}

#[test]
fn test_analyze_without_model_is_a_config_error() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    deepsense_cmd()
        .current_dir(dir.path())
        .args(["analyze", "--url", "https://cdn.example.com/clip.mp4"])
        .assert()
        .code(1)
        .stdout(contains(r#""error":"config""#))
        .stdout(contains("model_path"));
    Ok(())
}

#[test]
fn test_missing_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("nope.json");

    deepsense_cmd()
        .arg("--config")
        .arg(&missing)
        .args(["analyze", "--url", "https://cdn.example.com/clip.mp4"])
        .assert()
        .code(1)
        .stdout(contains("Failed to read config file"));
    Ok(())
}

#[test]
fn test_ask_without_question_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let analysis = dir.path().join("analysis.json");
    std::fs::write(
        &analysis,
        r#"{"detectedObjects":[{"name":"cat","count":2,"confidence":90}],"summary":"Video contains 2 cat(s)"}"#,
    )?;

    deepsense_cmd()
        .arg("ask")
        .arg("--analysis")
        .arg(&analysis)
        .assert()
        .code(2)
        .stdout(contains("question is required"));
    Ok(())
}

#[test]
fn test_log_dir_receives_log_file() -> Result<(), Box<dyn Error>> {
    let logs = tempdir()?;

    deepsense_cmd()
        .arg("--log-dir")
        .arg(logs.path())
        .arg("analyze")
        .assert()
        .code(2);

    let files = std::fs::read_dir(logs.path())?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().to_string_lossy().into_owned();
    assert!(name.starts_with("deepsense_") && name.ends_with(".log"));
    Ok(())
}
