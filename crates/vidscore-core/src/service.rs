//! Boundary to the remote extraction and ingest services.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use vidscore_proto::proto::{ExtractFromFramesRequest, ExtractFromVideoRequest};

use crate::error::CoreError;
use crate::media::MediaInfo;

/// Failure reported by a remote service. The message is shown to the user
/// as-is.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One export call: either lay out frames already sampled on this side, or
/// have the service sample the source video itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportRequest {
    FromFrames(ExtractFromFramesRequest),
    FromVideo(ExtractFromVideoRequest),
}

/// Renders a paginated document from frames or from a crop of the source.
#[allow(async_fn_in_trait)]
pub trait ExtractionService {
    async fn extract_from_video(
        &self,
        request: &ExtractFromVideoRequest,
    ) -> Result<Vec<u8>, ServiceError>;

    async fn extract_from_frames(
        &self,
        request: &ExtractFromFramesRequest,
    ) -> Result<Vec<u8>, ServiceError>;
}

/// Send `request` down the matching path. Service errors become
/// [`CoreError::ExportFailure`] with the service message untouched.
pub async fn dispatch_export<S: ExtractionService>(
    service: &S,
    request: &ExportRequest,
) -> Result<Vec<u8>, CoreError> {
    let result = match request {
        ExportRequest::FromFrames(req) => {
            info!(images = req.images.len(), frames_per_page = req.frames_per_page, "exporting previewed frames");
            service.extract_from_frames(req).await
        }
        ExportRequest::FromVideo(req) => {
            info!(media_id = %req.media_id, start_ms = req.start_ms, end_ms = req.end_ms, "exporting directly from video");
            service.extract_from_video(req).await
        }
    };
    result.map_err(|e| {
        warn!(error = %e, "export rejected by service");
        CoreError::ExportFailure(e.message)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

/// A fetched source, ready to open.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestResult {
    pub media: MediaInfo,
    /// Where the fetched media can be retrieved from; doubles as the media id
    /// in export requests.
    pub retrieval_ref: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Pending { progress: f32, message: String },
    Completed(IngestResult),
    Failed { message: String },
}

/// Downloads a source by URL as a background task.
#[allow(async_fn_in_trait)]
pub trait IngestService {
    async fn submit(&self, url: &str) -> Result<TaskId, ServiceError>;

    async fn poll(&self, task: &TaskId) -> Result<TaskStatus, ServiceError>;
}

#[derive(Debug, Clone, Copy)]
pub struct IngestPolling {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for IngestPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_polls: 600,
        }
    }
}

/// Submit `url` and poll until the task finishes.
pub async fn wait_for_ingest<S: IngestService>(
    service: &S,
    url: &str,
    polling: IngestPolling,
) -> Result<IngestResult, CoreError> {
    let task = service
        .submit(url)
        .await
        .map_err(|e| CoreError::MediaUnavailable(e.message))?;
    info!(url, task = %task.0, "ingest submitted");

    for attempt in 1..=polling.max_polls {
        let status = service
            .poll(&task)
            .await
            .map_err(|e| CoreError::MediaUnavailable(e.message))?;

        match status {
            TaskStatus::Completed(result) => {
                info!(
                    task = %task.0,
                    retrieval_ref = %result.retrieval_ref,
                    width = result.media.width,
                    height = result.media.height,
                    duration_ms = result.media.duration_ms,
                    "ingest completed"
                );
                return Ok(result);
            }
            TaskStatus::Failed { message } => {
                warn!(task = %task.0, %message, "ingest failed");
                return Err(CoreError::MediaUnavailable(message));
            }
            TaskStatus::Pending { progress, message } => {
                debug!(task = %task.0, attempt, progress, %message, "ingest pending");
            }
        }
        tokio::time::sleep(polling.interval).await;
    }

    Err(CoreError::MediaUnavailable(format!(
        "ingest of {url} did not finish after {} polls",
        polling.max_polls
    )))
}
