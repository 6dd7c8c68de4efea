use thiserror::Error;

use crate::frame::Frame;

/// Errors surfaced by the session and its components.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The crop region is degenerate, zero-sized, or cannot be mapped.
    #[error("invalid crop region: {0}")]
    InvalidCrop(String),

    /// Start is not before end, or the interval is zero.
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Crop mapping needs the natural size recorded by a reference capture.
    #[error("no reference frame has been captured")]
    NoReferenceFrame,

    /// The media failed to load, seek, or answer within the seek timeout.
    #[error("media unavailable: {0}")]
    MediaUnavailable(String),

    /// A single still could not be drawn or encoded.
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// The extraction service rejected or failed the export. Carries the
    /// service message verbatim.
    #[error("export failed: {0}")]
    ExportFailure(String),
}

/// A sampling run that stopped early. Owns the frames captured before the
/// failure so callers can keep them.
#[derive(Debug, Error)]
#[error("sampling stopped after {} frame(s): {error}", .frames.len())]
pub struct PartialSample {
    pub frames: Vec<Frame>,
    #[source]
    pub error: CoreError,
}

impl PartialSample {
    pub(crate) fn empty(error: CoreError) -> Self {
        Self {
            frames: Vec::new(),
            error,
        }
    }
}
