#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use tempfile::TempDir;

use ytmerge::error::MuxError;
use ytmerge::models::job::StorageLayout;
use ytmerge::models::progress::ProgressState;
use ytmerge::service::hub::{ProgressHub, Subscription};
use ytmerge::service::muxer::{Muxer, RatioCallback};
use ytmerge::service::orchestrator::Orchestrator;
use ytmerge::service::runner::{ExitCodePolicy, ToolCommand};

/// Muxer double: reports the given ratios, then writes the output or fails.
#[derive(Default)]
pub struct StubMuxer {
    pub ratios: Vec<f64>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubMuxer {
    pub fn succeeding(ratios: &[f64]) -> Arc<Self> {
        Arc::new(Self {
            ratios: ratios.to_vec(),
            ..Default::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Muxer for StubMuxer {
    async fn merge(
        &self,
        _video: &Path,
        _audio: &Path,
        output: &Path,
        on_progress: RatioCallback<'_>,
    ) -> Result<(), MuxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for ratio in &self.ratios {
            on_progress(*ratio);
        }
        if self.fail {
            return Err(MuxError::Failed {
                code: Some(1),
                stderr: "Invalid data found when processing input".into(),
            });
        }
        tokio::fs::write(output, b"merged").await?;
        Ok(())
    }
}

/// Downloader double built on `sh -c`; job arguments arrive as `$1..$5`
/// (`-f <format> <url> -o <path>`).
pub fn sh_tool(script: &str) -> ToolCommand {
    ToolCommand::new("sh").with_args(["-c", script, "stub"])
}

/// Creates the `-o` target and exits 0.
pub fn touching_tool() -> ToolCommand {
    sh_tool(": > \"$5\"")
}

pub struct Fixture {
    pub dir: TempDir,
    pub hub: Arc<ProgressHub>,
    pub layout: StorageLayout,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("downloads"), dir.path().join("merged"));
        std::fs::create_dir_all(&layout.download_dir).unwrap();
        std::fs::create_dir_all(&layout.merged_dir).unwrap();
        Self {
            dir,
            hub: Arc::new(ProgressHub::new()),
            layout,
        }
    }

    pub fn orchestrator(&self, downloader: ToolCommand, policy: ExitCodePolicy, muxer: Arc<StubMuxer>) -> Orchestrator {
        Orchestrator::new(self.hub.clone(), downloader, policy, muxer, self.layout.clone())
    }
}

pub fn parse_frame(frame: &[u8]) -> ProgressState {
    let text = std::str::from_utf8(frame).unwrap();
    let json = text
        .strip_prefix("data: ")
        .and_then(|t| t.strip_suffix("\n\n"))
        .unwrap_or_else(|| panic!("not an event frame: {:?}", text));
    serde_json::from_str(json).unwrap()
}

/// Every event queued on `sub` so far.
pub fn drain(sub: &mut Subscription) -> Vec<ProgressState> {
    let mut out = Vec::new();
    while let Some(Some(frame)) = sub.next().now_or_never() {
        out.push(parse_frame(&frame));
    }
    out
}

pub fn percents_for(events: &[ProgressState], step: &str) -> Vec<u8> {
    events.iter().filter(|e| e.step == step).map(|e| e.percent).collect()
}
