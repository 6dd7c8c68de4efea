//! Boundary to the seekable media source.
//!
//! A source exposes one playback position at a time. Seeks are requested
//! with an id and confirmed asynchronously by a completion event carrying the
//! same id; [`Seeker`] turns that into a single awaitable step.

pub mod ffmpeg;
mod seek;

#[cfg(test)]
pub(crate) mod fake;

pub use seek::{Seeker, DEFAULT_SEEK_TIMEOUT};

use image::RgbImage;
use thiserror::Error;

use crate::error::CoreError;
use crate::rect::{NaturalRect, Size};

/// Attributes of a loaded media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
}

impl MediaInfo {
    pub fn size(&self) -> Size {
        Size::from_pixels(self.width, self.height)
    }
}

/// Identifies one issued seek so its completion can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeekId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    pub id: SeekId,
    pub position_ms: u64,
}

/// Emitted by the source once the frame at `position_ms` is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekCompleted {
    pub id: SeekId,
    pub position_ms: u64,
}

#[derive(Debug, Error)]
pub enum MediaError {
    /// The handle is gone: load failure, lost decoder, closed event stream.
    #[error("{0}")]
    Unavailable(String),

    /// The current frame could not be drawn. Other positions may still work.
    #[error("{0}")]
    Capture(String),
}

impl From<MediaError> for CoreError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::Unavailable(reason) => CoreError::MediaUnavailable(reason),
            MediaError::Capture(reason) => CoreError::CaptureFailure(reason),
        }
    }
}

/// A seekable, time-indexed visual source.
///
/// Callers must not issue a new seek before the previous one completed;
/// [`Seeker`] enforces this by awaiting each completion.
#[allow(async_fn_in_trait)]
pub trait MediaSource {
    fn info(&self) -> MediaInfo;

    /// Position of the frame currently shown.
    fn position_ms(&self) -> u64;

    /// Start moving to `request.position_ms`. Completion is reported through
    /// [`MediaSource::next_seek_event`].
    fn request_seek(&mut self, request: SeekRequest) -> Result<(), MediaError>;

    /// Wait for the next seek completion, which may belong to an earlier
    /// request.
    async fn next_seek_event(&mut self) -> Result<SeekCompleted, MediaError>;

    /// Copy `rect` out of the current frame.
    fn capture_still(&mut self, rect: NaturalRect) -> Result<RgbImage, MediaError>;
}
