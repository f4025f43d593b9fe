//! Runs one job: video download, audio download, merge.

use std::sync::Arc;

use log::{error, info};

use crate::error::JobError;
use crate::models::job::{Job, JobStage, StorageLayout, StreamKind};
use crate::service::hub::ProgressHub;
use crate::service::muxer::Muxer;
use crate::service::parse::merge_percent;
use crate::service::runner::{ExitCodePolicy, Runner, ToolCommand};

pub struct Orchestrator {
    hub: Arc<ProgressHub>,
    runner: Runner,
    downloader: ToolCommand,
    muxer: Arc<dyn Muxer>,
    layout: StorageLayout,
}

impl Orchestrator {
    pub fn new(
        hub: Arc<ProgressHub>,
        downloader: ToolCommand,
        exit_policy: ExitCodePolicy,
        muxer: Arc<dyn Muxer>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            runner: Runner::new(Arc::clone(&hub), exit_policy),
            hub,
            downloader,
            muxer,
            layout,
        }
    }

    /// Run the whole pipeline for `url`. On success the returned job's
    /// `output_path` holds the merged file.
    ///
    /// The url is trimmed; a blank one is a [`JobError::Validation`] and
    /// nothing is published.
    pub async fn run(&self, url: &str) -> Result<Job, JobError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(JobError::validation("URL is missing"));
        }

        let job = Job::new(url, &self.layout);
        info!("Job {} started for {}", job.id, job.url);

        match self.execute(&job).await {
            Ok(()) => {
                info!("Job {} done: {}", job.id, job.output_path.display());
                Ok(job)
            }
            Err(e) => {
                error!("Job {} failed: {}", job.id, e);
                self.hub.publish(JobStage::Failed.label(), 0);
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &Job) -> Result<(), JobError> {
        self.download(job, StreamKind::Video).await?;
        self.download(job, StreamKind::Audio).await?;
        self.merge(job).await?;
        self.hub.publish(JobStage::Done.label(), 100);
        Ok(())
    }

    async fn download(&self, job: &Job, stream: StreamKind) -> Result<(), JobError> {
        self.hub.publish(JobStage::download(stream).label(), 0);
        self.runner
            .run_tool(&self.downloader, job.download_args(stream))
            .await
            .map_err(|source| JobError::Download { stream, source })
    }

    async fn merge(&self, job: &Job) -> Result<(), JobError> {
        let step = JobStage::Merge.label();
        self.hub.publish(step, 0);

        let hub = Arc::clone(&self.hub);
        let on_progress = move |ratio: f64| hub.publish(step, merge_percent(ratio));
        self.muxer
            .merge(&job.video_path, &job.audio_path, &job.output_path, &on_progress)
            .await?;
        Ok(())
    }
}
