//! External tool invocation with best-effort progress scraping.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::RunnerError;
use crate::service::hub::ProgressHub;
use crate::service::parse::parse_percent;
use crate::service::utils::read_segment;

/// What a non-zero exit status means for a download stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCodePolicy {
    /// Any exit counts as success; the status is only logged.
    #[default]
    Ignore,
    /// A non-zero exit fails the stage.
    Fail,
}

/// A program plus the arguments that always precede per-job arguments,
/// e.g. `python3 -m yt_dlp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split a whitespace-separated command line. `None` if it is blank.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).with_args(words))
    }
}

pub struct Runner {
    hub: Arc<ProgressHub>,
    exit_policy: ExitCodePolicy,
}

impl Runner {
    pub fn new(hub: Arc<ProgressHub>, exit_policy: ExitCodePolicy) -> Self {
        Self { hub, exit_policy }
    }

    /// Run `tool` with `args` appended, publishing scraped percents under the
    /// hub's current step. Publishes 100 once the process has exited.
    pub async fn run_tool<I, S>(&self, tool: &ToolCommand, args: I) -> Result<(), RunnerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut all: Vec<std::ffi::OsString> = tool.leading_args.iter().map(Into::into).collect();
        all.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self.run(&tool.program, all).await
    }

    pub async fn run<I, S>(&self, program: &Path, args: I) -> Result<(), RunnerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Running {:?}", command);

        let mut child = command.spawn().map_err(|source| RunnerError::SpawnFailed {
            program: program.to_path_buf(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (out, err) = tokio::join!(self.scan(stdout), self.scan(stderr));
        let status = child.wait().await?;
        out?;
        err?;

        if !status.success() {
            match self.exit_policy {
                ExitCodePolicy::Ignore => {
                    warn!("{} exited with {}, treating as success", program.display(), status);
                }
                ExitCodePolicy::Fail => {
                    return Err(RunnerError::NonZeroExit {
                        program: program.to_path_buf(),
                        code: status.code(),
                    });
                }
            }
        } else {
            info!("{} finished", program.display());
        }

        self.hub.update_percent(100);
        Ok(())
    }

    async fn scan<R>(&self, stream: Option<R>) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let Some(stream) = stream else {
            return Ok(());
        };
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if read_segment(&mut reader, &mut buf).await? == 0 {
                return Ok(());
            }
            let text = String::from_utf8_lossy(&buf);
            match parse_percent(&text) {
                Some(percent) => self.hub.update_percent(percent),
                None => trace!("tool: {}", text.trim_end()),
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::progress::ProgressState;
    use futures::{FutureExt, StreamExt};

    fn percents(sub: &mut crate::service::hub::Subscription) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(Some(frame)) = sub.next().now_or_never() {
            let text = std::str::from_utf8(&frame).unwrap();
            let json = &text["data: ".len()..text.len() - 2];
            let state: ProgressState = serde_json::from_str(json).unwrap();
            out.push(state.percent);
        }
        out
    }

    #[tokio::test]
    async fn scraped_percents_are_published_in_order() {
        let hub = Arc::new(ProgressHub::new());
        hub.publish("downloading video", 0);
        let mut sub = hub.subscribe();
        let runner = Runner::new(hub.clone(), ExitCodePolicy::Ignore);

        runner
            .run(Path::new("sh"), ["-c", "printf '12.3%% done\\n45.6%% done\\n100.0%% done\\n'"])
            .await
            .unwrap();

        assert_eq!(percents(&mut sub), vec![0, 12, 45, 100, 100]);
        assert_eq!(hub.current(), ProgressState::new("downloading video", 100));
    }

    #[tokio::test]
    async fn stderr_and_carriage_returns_are_scanned() {
        let hub = Arc::new(ProgressHub::new());
        hub.publish("downloading audio", 0);
        let mut sub = hub.subscribe();
        let runner = Runner::new(hub.clone(), ExitCodePolicy::Ignore);

        runner
            .run(Path::new("sh"), ["-c", "printf '[download]  7.5%%\\r[download] 63.1%%\\r' >&2"])
            .await
            .unwrap();

        assert_eq!(percents(&mut sub), vec![0, 7, 63, 100]);
    }

    #[tokio::test]
    async fn non_zero_exit_is_ignored_by_default() {
        let hub = Arc::new(ProgressHub::new());
        let runner = Runner::new(hub.clone(), ExitCodePolicy::Ignore);

        runner.run(Path::new("sh"), ["-c", "exit 3"]).await.unwrap();
        assert_eq!(hub.current().percent, 100);
    }

    #[tokio::test]
    async fn non_zero_exit_fails_under_strict_policy() {
        let hub = Arc::new(ProgressHub::new());
        hub.publish("downloading video", 0);
        let runner = Runner::new(hub.clone(), ExitCodePolicy::Fail);

        let err = runner.run(Path::new("sh"), ["-c", "exit 3"]).await.unwrap_err();
        assert!(matches!(err, RunnerError::NonZeroExit { code: Some(3), .. }));
        assert_eq!(hub.current().percent, 0);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let hub = Arc::new(ProgressHub::new());
        let runner = Runner::new(hub.clone(), ExitCodePolicy::Ignore);

        let err = runner
            .run(Path::new("/definitely/not/here/yt-dlp"), ["--version"])
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailed { .. }));
        assert_eq!(hub.current(), ProgressState::default());
    }

    #[tokio::test]
    async fn leading_args_come_first() {
        let hub = Arc::new(ProgressHub::new());
        let mut sub = hub.subscribe();
        let runner = Runner::new(hub.clone(), ExitCodePolicy::Fail);
        let script = "if [ \"$1\" = -f ] && [ \"$2\" = bestvideo ]; then printf '88.8%%'; fi";
        let tool = ToolCommand::new("sh").with_args(["-c", script, "stub"]);

        runner.run_tool(&tool, ["-f", "bestvideo"]).await.unwrap();
        assert_eq!(percents(&mut sub), vec![0, 88, 100]);
    }

    #[test]
    fn parse_tool_command() {
        let tool = ToolCommand::parse("python3 -m yt_dlp").unwrap();
        assert_eq!(tool.program, PathBuf::from("python3"));
        assert_eq!(tool.leading_args, vec!["-m", "yt_dlp"]);
        assert_eq!(ToolCommand::parse("   "), None);
    }
}
