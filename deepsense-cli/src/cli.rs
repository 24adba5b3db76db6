// deepsense-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "DeepSense: Video content analysis",
    long_about = "Samples frames from a video, labels them with an inference backend and \
                  reports an aggregated summary of the objects it contains."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional: JSON configuration file (DEEPSENSE_* variables override it)
    #[arg(short, long, global = true, value_name = "FILE", env = "DEEPSENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Optional: Write logs to a timestamped file in this directory instead of stderr
    #[arg(short, long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyzes a video and prints the aggregated result as JSON
    Analyze(AnalyzeArgs),
    /// Answers a question about a previous analysis using the hosted model
    Ask(AskArgs),
    /// Checks that ffmpeg and ffprobe are installed
    Check,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// URL or path of the video to analyze
    #[arg(short, long, value_name = "VIDEO_URL", conflicts_with = "request")]
    pub url: Option<String>,

    /// Read the request body (`{"videourl": "..."}`) from a JSON file
    #[arg(short, long, value_name = "FILE")]
    pub request: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    #[arg(short, long)]
    pub question: Option<String>,

    /// JSON file holding a previous analysis result
    #[arg(short, long, value_name = "FILE")]
    pub analysis: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_url() {
        let cli = Cli::parse_from(["deepsense", "analyze", "--url", "https://example.com/a.mp4"]);

        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.url.as_deref(), Some("https://example.com/a.mp4"));
                assert!(args.request.is_none());
            }
            other => panic!("Expected Analyze command, got {:?}", other),
        }
        assert!(!cli.verbose);
        assert!(cli.log_dir.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "deepsense",
            "analyze",
            "--request",
            "body.json",
            "--log-dir",
            "logs",
            "--verbose",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.log_dir, Some(PathBuf::from("logs")));
        match cli.command {
            Commands::Analyze(args) => assert_eq!(args.request, Some(PathBuf::from("body.json"))),
            other => panic!("Expected Analyze command, got {:?}", other),
        }
    }

    #[test]
    fn test_url_conflicts_with_request() {
        let result = Cli::try_parse_from([
            "deepsense",
            "analyze",
            "--url",
            "a.mp4",
            "--request",
            "body.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ask_requires_analysis_file() {
        assert!(Cli::try_parse_from(["deepsense", "ask", "--question", "What animals?"]).is_err());

        let cli = Cli::parse_from(["deepsense", "ask", "-q", "What animals?", "-a", "result.json"]);
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.question.as_deref(), Some("What animals?"));
                assert_eq!(args.analysis, PathBuf::from("result.json"));
            }
            other => panic!("Expected Ask command, got {:?}", other),
        }
    }
}
