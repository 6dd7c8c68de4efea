use std::time::Duration;

use tracing::{debug, error};

use super::{MediaSource, SeekCompleted, SeekId, SeekRequest};
use crate::error::CoreError;

/// Upper bound on a single seek wait.
pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues seeks one at a time and waits for the matching completion.
#[derive(Debug)]
pub struct Seeker {
    next_id: u64,
    timeout: Duration,
}

impl Seeker {
    pub fn new(timeout: Duration) -> Self {
        Self { next_id: 0, timeout }
    }

    /// Seek `media` to `position_ms` and wait until that exact request is
    /// confirmed. Completions for earlier requests are dropped.
    pub async fn seek<M: MediaSource>(
        &mut self,
        media: &mut M,
        position_ms: u64,
    ) -> Result<SeekCompleted, CoreError> {
        let id = SeekId(self.next_id);
        self.next_id += 1;

        media.request_seek(SeekRequest { id, position_ms })?;
        debug!(seek_id = id.0, position_ms, "seek requested");

        match tokio::time::timeout(self.timeout, wait_for(media, id)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    seek_id = id.0,
                    position_ms,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "seek did not complete in time"
                );
                Err(CoreError::MediaUnavailable(format!(
                    "seek to {position_ms}ms did not complete within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

impl Default for Seeker {
    fn default() -> Self {
        Self::new(DEFAULT_SEEK_TIMEOUT)
    }
}

async fn wait_for<M: MediaSource>(media: &mut M, id: SeekId) -> Result<SeekCompleted, CoreError> {
    loop {
        let event = media.next_seek_event().await?;
        if event.id == id {
            debug!(seek_id = id.0, position_ms = event.position_ms, "seek completed");
            return Ok(event);
        }
        debug!(
            expected = id.0,
            received = event.id.0,
            "ignoring stale seek completion"
        );
    }
}
