use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Where jobs stage their downloads and write merged artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub download_dir: PathBuf,
    pub merged_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(download_dir: impl Into<PathBuf>, merged_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            merged_dir: merged_dir.into(),
        }
    }

    /// Create both directories if they are missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        tokio::fs::create_dir_all(&self.merged_dir).await?;
        Ok(())
    }
}

/// One end-to-end request: one url in, one merged file out.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub url: String,
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
}

impl Job {
    pub fn new(url: impl Into<String>, layout: &StorageLayout) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            url: url.into(),
            video_path: layout.download_dir.join(format!("{}_video.mp4", id)),
            audio_path: layout.download_dir.join(format!("{}_audio.m4a", id)),
            output_path: layout.merged_dir.join(format!("{}.mp4", id)),
        }
    }

    /// Downloader arguments for one stream of this job.
    pub fn download_args(&self, kind: StreamKind) -> Vec<String> {
        let target = match kind {
            StreamKind::Video => &self.video_path,
            StreamKind::Audio => &self.audio_path,
        };
        vec![
            "-f".to_string(),
            kind.format_selector().to_string(),
            self.url.clone(),
            "-o".to_string(),
            path_arg(target),
        ]
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Which elementary stream a download stage fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn format_selector(self) -> &'static str {
        match self {
            StreamKind::Video => "bestvideo",
            StreamKind::Audio => "bestaudio",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => f.write_str("video"),
            StreamKind::Audio => f.write_str("audio"),
        }
    }
}

/// Pipeline stages and the step label each one publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    DownloadVideo,
    DownloadAudio,
    Merge,
    Done,
    Failed,
}

impl JobStage {
    pub fn label(self) -> &'static str {
        match self {
            JobStage::DownloadVideo => "downloading video",
            JobStage::DownloadAudio => "downloading audio",
            JobStage::Merge => "merging",
            JobStage::Done => "done",
            JobStage::Failed => "error",
        }
    }

    pub fn download(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Video => JobStage::DownloadVideo,
            StreamKind::Audio => JobStage::DownloadAudio,
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
