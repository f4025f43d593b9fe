//! Merging a video-only and an audio-only file without re-encoding.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::BufReader;
use tokio::process::Command;

use crate::error::MuxError;
use crate::service::parse::{parse_duration_line, parse_out_time_line};
use crate::service::runner::ToolCommand;
use crate::service::utils::read_segment;

/// Diagnostic lines kept for the error message of a failed merge.
const STDERR_TAIL_LINES: usize = 8;

/// Receives the merge progress as a ratio, nominally 0.0 to 1.0.
pub type RatioCallback<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[async_trait]
pub trait Muxer: Send + Sync {
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        on_progress: RatioCallback<'_>,
    ) -> Result<(), MuxError>;
}

pub struct FfmpegMuxer {
    ffmpeg: ToolCommand,
}

impl FfmpegMuxer {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self::with_command(ToolCommand::new(ffmpeg))
    }

    /// Use `command` in place of a bare ffmpeg binary; its leading arguments
    /// come before the merge arguments.
    pub fn with_command(command: ToolCommand) -> Self {
        Self { ffmpeg: command }
    }

    pub fn build_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let path = |p: &Path| p.to_string_lossy().into_owned();
        vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            path(video),
            "-i".to_string(),
            path(audio),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            path(output),
        ]
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        on_progress: RatioCallback<'_>,
    ) -> Result<(), MuxError> {
        let args = Self::build_args(video, audio, output);
        debug!("Running {} {}", self.ffmpeg.program.display(), args.join(" "));

        let mut child = Command::new(&self.ffmpeg.program)
            .args(&self.ffmpeg.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MuxError::SpawnFailed {
                program: self.ffmpeg.program.clone(),
                source,
            })?;

        // Metadata tags are echoed as raw bytes, so lines are decoded lossily.
        // A read error ends the scan only; the exit status decides the outcome.
        let mut tracker = MergeProgress::default();
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match read_segment(&mut reader, &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        if let Some(ratio) = tracker.feed(line.trim_end()) {
                            on_progress(ratio);
                        }
                    }
                    Err(e) => {
                        warn!("Stopped reading ffmpeg output: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            info!("Merged into {}", output.display());
            Ok(())
        } else {
            warn!("ffmpeg exited with {}", status);
            Err(MuxError::Failed {
                code: status.code(),
                stderr: tracker.into_tail(),
            })
        }
    }
}

/// Running state over ffmpeg's stderr: total input length plus a short tail of
/// diagnostic output.
#[derive(Debug, Default)]
struct MergeProgress {
    total_secs: f64,
    tail: VecDeque<String>,
}

impl MergeProgress {
    fn feed(&mut self, line: &str) -> Option<f64> {
        if let Some(secs) = parse_duration_line(line) {
            self.total_secs = self.total_secs.max(secs);
            return None;
        }
        if let Some(position) = parse_out_time_line(line) {
            return (self.total_secs > 0.0).then(|| position / self.total_secs);
        }
        if !is_progress_key(line) && !line.trim().is_empty() {
            if self.tail.len() == STDERR_TAIL_LINES {
                self.tail.pop_front();
            }
            self.tail.push_back(line.trim().to_string());
        }
        None
    }

    fn into_tail(self) -> String {
        Vec::from(self.tail).join("\n")
    }
}

fn is_progress_key(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, _)) => !key.is_empty() && key.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'),
        None => false,
    }
}
