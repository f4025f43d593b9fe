use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::job::StorageLayout;
use crate::service::hub::ProgressHub;
use crate::service::orchestrator::Orchestrator;

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
}

impl DownloadRequest {
    /// The submitted url as sent; an absent field reads as empty and is
    /// rejected by [`Orchestrator::run`].
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub file: String,
    pub download_url: String,
}

impl DownloadResponse {
    pub fn for_output(path: &Path) -> Self {
        let file = path.to_string_lossy().into_owned();
        let encoded: String = url::form_urlencoded::byte_serialize(file.as_bytes()).collect();
        Self {
            download_url: format!("/file?path={}", encoded),
            file,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: Option<String>,
}

pub struct AppState {
    pub hub: Arc<ProgressHub>,
    pub orchestrator: Arc<Orchestrator>,
    pub layout: StorageLayout,
}
