//! Error types for the download pipeline and its HTTP edge.

use std::path::PathBuf;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::job::StreamKind;

/// Failures of a single external-tool invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to launch {}: {source}", .program.display())]
    SpawnFailed {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{} exited with status {code:?}", .program.display())]
    NonZeroExit { program: PathBuf, code: Option<i32> },

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the merge call.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("failed to launch {}: {source}", .program.display())]
    SpawnFailed {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("muxer exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("muxer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a job did not produce an artifact.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Validation(String),

    #[error("{stream} download failed: {source}")]
    Download {
        stream: StreamKind,
        #[source]
        source: RunnerError,
    },

    #[error("merge failed: {0}")]
    Merge(#[from] MuxError),
}

impl JobError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl ResponseError for JobError {
    fn status_code(&self) -> StatusCode {
        match self {
            JobError::Validation(_) => StatusCode::BAD_REQUEST,
            JobError::Download { .. } | JobError::Merge(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            JobError::Validation(msg) => json!({ "error": msg }),
            other => json!({ "error": "Pipeline failed", "details": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Invalid `YTMERGE_*` settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("invalid value {value:?} for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}
