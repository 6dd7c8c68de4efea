//! Crop a region of a video, sample it at a fixed cadence, and lay the
//! samples out on pages.

pub mod compose;
pub mod config;
pub mod debug;
pub mod error;
pub mod frame;
pub mod layout;
pub mod media;
pub mod rect;
pub mod sampler;
pub mod service;
pub mod session;
pub mod timeline;

pub use config::PageSpec;
pub use error::{CoreError, PartialSample};
pub use frame::{Frame, FrameCollection, FrameId, FrameIdCounter};
pub use layout::{compute_frames_per_page, compute_page_count, FramesPerPageMode, LayoutParams};
pub use media::{MediaError, MediaInfo, MediaSource};
pub use rect::{map_to_natural, DisplayRect, NaturalRect, Size};
pub use sampler::{FrameSampler, SamplerConfig};
pub use service::{ExportRequest, ExtractionService, IngestService, ServiceError};
pub use session::{ExportResult, ReferenceFrame, Session};
pub use timeline::TimeRange;
