// ============================================================================
// deepsense-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with FFmpeg
// processes, and the single-frame extraction command used by the frame
// decoder.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - extract_frame_at: Writes one still image taken at a given timestamp

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use crate::utils::format_seek_time;
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::path::Path;
use std::process::ExitStatus;

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error(
                "ffmpeg (sidecar - get iter)",
                ExitStatus::default(),
                e.to_string(),
            )
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

// --- Frame Extraction ---

/// Builds the command extracting a single frame at `timestamp_secs` from
/// `source`, scaled to `width` pixels wide (height keeps the aspect ratio,
/// rounded to an even number).
pub fn build_frame_command(
    source: &str,
    timestamp_secs: f64,
    width: u32,
    output_path: &Path,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    // Seek before the input for fast keyframe-based seeking
    cmd.arg("-ss");
    cmd.arg(format_seek_time(timestamp_secs));
    cmd.input(source);
    cmd.args(["-frames:v", "1"]);
    cmd.arg("-vf");
    cmd.arg(format!("scale={width}:-2"));
    cmd.arg("-an");
    cmd.arg("-sn");
    cmd.overwrite();
    cmd.output(output_path.to_string_lossy().as_ref());
    cmd
}

/// Extracts one still frame into `output_path`.
///
/// Errors from ffmpeg are collected from its event stream so a failed exit
/// carries the reason.
pub fn extract_frame_at<S: FfmpegSpawner>(
    spawner: &S,
    source: &str,
    timestamp_secs: f64,
    width: u32,
    output_path: &Path,
) -> CoreResult<()> {
    let cmd = build_frame_command(source, timestamp_secs, width, output_path);
    log::debug!("Running frame extraction command: {:?}", cmd);

    let mut process = spawner.spawn(cmd)?;

    let mut error_lines: Vec<String> = Vec::new();
    process.handle_events(|event| {
        match event {
            FfmpegEvent::Error(line)
            | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                error_lines.push(line);
            }
            _ => {}
        }
        Ok(())
    })?;

    let status = process.wait()?;
    if !status.success() {
        return Err(command_failed_error(
            "ffmpeg (frame extraction)",
            status,
            error_lines.join("; "),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_of(cmd: &mut FfmpegCommand) -> Vec<String> {
        cmd.as_inner()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_frame_command_seeks_before_input() {
        let out = PathBuf::from("/scratch/frame-2.png");
        let mut cmd = build_frame_command("https://cdn.example.com/v.mp4", 12.5, 640, &out);
        let args = args_of(&mut cmd);

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "12.500");
        assert_eq!(args[input + 1], "https://cdn.example.com/v.mp4");
        assert!(args.contains(&"scale=640:-2".to_string()));
        assert_eq!(args.last().unwrap(), "/scratch/frame-2.png");
    }
}
