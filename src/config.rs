//! Service settings read from `YTMERGE_*` environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::models::job::StorageLayout;
use crate::service::runner::{ExitCodePolicy, ToolCommand};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub downloader: ToolCommand,
    pub ffmpeg: PathBuf,
    pub layout: StorageLayout,
    pub exit_policy: ExitCodePolicy,
    pub log_config: PathBuf,
    pub templates: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let downloader_line = get("YTMERGE_DOWNLOADER", "yt-dlp");
        let downloader = ToolCommand::parse(&downloader_line).ok_or(ConfigError::Empty {
            key: "YTMERGE_DOWNLOADER",
        })?;

        let ffmpeg = get("YTMERGE_FFMPEG", "ffmpeg");
        if ffmpeg.trim().is_empty() {
            return Err(ConfigError::Empty { key: "YTMERGE_FFMPEG" });
        }

        Ok(Self {
            bind: get("YTMERGE_BIND", "127.0.0.1:3000"),
            downloader,
            ffmpeg: PathBuf::from(ffmpeg.trim()),
            layout: StorageLayout::new(
                get("YTMERGE_DOWNLOAD_DIR", "downloads"),
                get("YTMERGE_MERGED_DIR", "merged"),
            ),
            exit_policy: parse_exit_policy(&get("YTMERGE_EXIT_CODES", "ignore"))?,
            log_config: PathBuf::from(get("YTMERGE_LOG_CONFIG", "config/log4rs.yml")),
            templates: get("YTMERGE_TEMPLATES", "templates/**/*"),
        })
    }
}

fn parse_exit_policy(value: &str) -> Result<ExitCodePolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "ignore" => Ok(ExitCodePolicy::Ignore),
        "strict" | "fail" => Ok(ExitCodePolicy::Fail),
        _ => Err(ConfigError::Invalid {
            key: "YTMERGE_EXIT_CODES",
            value: value.to_string(),
            expected: "ignore or strict",
        }),
    }
}
