use image::RgbImage;
use tracing::{debug, info, warn};
use vidscore_proto::proto::{ExtractFromFramesRequest, ExtractFromVideoRequest};

use crate::config::PageSpec;
use crate::error::CoreError;
use crate::frame::{Frame, FrameCollection, FrameId, FrameIdCounter};
use crate::layout::{compute_frames_per_page, compute_page_count, LayoutParams};
use crate::media::MediaSource;
use crate::rect::{map_to_natural, DisplayRect, NaturalRect, Size};
use crate::sampler::{FrameSampler, SamplerConfig};
use crate::service::{dispatch_export, ExportRequest, ExtractionService, IngestResult};
use crate::timeline::{TimeRange, DEFAULT_INTERVAL_MS};

/// Largest default crop, in source pixels.
const DEFAULT_CROP_WIDTH: u32 = 800;
const DEFAULT_CROP_HEIGHT: u32 = 400;

/// A full still used to draw the crop on.
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    pub image: RgbImage,
    pub position_ms: u64,
}

impl ReferenceFrame {
    pub fn natural_size(&self) -> Size {
        Size::from_pixels(self.image.width(), self.image.height())
    }
}

/// The request sent and the document the service returned.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub request: ExportRequest,
    pub document: Vec<u8>,
}

/// Owns the state of one editing session over one media source.
///
/// Every operation that touches the media takes `&mut self`, so at most one
/// sampling run or seek is in flight per session.
pub struct Session<M> {
    media: M,
    media_id: String,
    title: Option<String>,
    page: PageSpec,
    sampler: FrameSampler,
    frame_ids: FrameIdCounter,
    reference: Option<ReferenceFrame>,
    displayed_size: Option<Size>,
    crop: Option<DisplayRect>,
    time_range: Option<TimeRange>,
    frames: FrameCollection,
    layout: LayoutParams,
}

impl<M: MediaSource> Session<M> {
    pub fn new(media: M, media_id: impl Into<String>) -> Self {
        let duration_ms = media.info().duration_ms;
        let time_range = TimeRange::new(0, duration_ms, DEFAULT_INTERVAL_MS).ok();

        let session = Self {
            media,
            media_id: media_id.into(),
            title: None,
            page: PageSpec::default(),
            sampler: FrameSampler::default(),
            frame_ids: FrameIdCounter::new(),
            reference: None,
            displayed_size: None,
            crop: None,
            time_range,
            frames: FrameCollection::new(),
            layout: LayoutParams::default(),
        };
        info!(media_id = %session.media_id, duration_ms, "session created");
        session
    }

    /// Start a session on a source fetched by the ingest service.
    pub fn from_ingest(media: M, ingest: IngestResult) -> Self {
        Self::new(media, ingest.retrieval_ref).with_title(ingest.title)
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_page_spec(mut self, page: PageSpec) -> Self {
        self.page = page;
        self
    }

    pub fn with_sampler_config(mut self, config: SamplerConfig) -> Self {
        self.sampler = FrameSampler::new(config);
        self
    }

    pub fn with_layout(mut self, layout: LayoutParams) -> Self {
        self.layout = layout;
        self
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn page_spec(&self) -> &PageSpec {
        &self.page
    }

    pub fn reference(&self) -> Option<&ReferenceFrame> {
        self.reference.as_ref()
    }

    pub fn crop(&self) -> Option<DisplayRect> {
        self.crop
    }

    pub fn displayed_size(&self) -> Option<Size> {
        self.displayed_size
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        self.time_range
    }

    pub fn frames(&self) -> &FrameCollection {
        &self.frames
    }

    pub fn layout(&self) -> &LayoutParams {
        &self.layout
    }

    pub fn page_count(&self) -> usize {
        compute_page_count(self.frames.len(), self.layout.frames_per_page())
    }

    pub fn set_crop_region(&mut self, rect: DisplayRect) -> Result<(), CoreError> {
        let rect = rect.normalized()?;
        debug!(?rect, "crop region set");
        self.crop = Some(rect);
        self.recompute_layout();
        Ok(())
    }

    /// Record the on-screen size the reference frame is shown at.
    pub fn set_displayed_size(&mut self, size: Size) -> Result<(), CoreError> {
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(CoreError::InvalidCrop(format!(
                "displayed size must be positive, got {}x{}",
                size.width, size.height
            )));
        }
        self.displayed_size = Some(size);
        self.recompute_layout();
        Ok(())
    }

    pub fn set_time_range(
        &mut self,
        start_ms: u64,
        end_ms: u64,
        interval_ms: u64,
    ) -> Result<(), CoreError> {
        self.time_range = Some(TimeRange::new(start_ms, end_ms, interval_ms)?);
        Ok(())
    }

    pub fn set_frame_width_percent(&mut self, percent: u32) -> Result<(), CoreError> {
        self.layout.set_frame_width_percent(percent)?;
        self.recompute_layout();
        Ok(())
    }

    pub fn set_gap_px(&mut self, gap_px: u32) {
        self.layout.set_gap_px(gap_px);
        self.recompute_layout();
    }

    /// Pin frames per page; later recomputes leave it alone.
    pub fn set_frames_per_page(&mut self, frames_per_page: u32) -> Result<(), CoreError> {
        self.layout.set_manual_frames_per_page(frames_per_page)
    }

    /// Hand frames per page back to the planner.
    pub fn set_auto_layout(&mut self) {
        self.layout.set_auto();
        self.recompute_layout();
    }

    /// Grab a full still to draw the crop on.
    ///
    /// The first capture jumps to the middle of the media for a
    /// representative picture, or to 0 when the duration is unknown, so a
    /// frame is decoded before anything is drawn. Later captures use the
    /// current position. Also
    /// seeds the displayed size and a default crop when none is set.
    pub async fn capture_reference_frame(&mut self) -> Result<&ReferenceFrame, CoreError> {
        let info = self.media.info();
        if self.reference.is_none() {
            self.sampler
                .seeker()
                .seek(&mut self.media, info.duration_ms / 2)
                .await?;
        }

        let full = NaturalRect::full(info.width, info.height)?;
        let image = self.media.capture_still(full)?;
        let position_ms = self.media.position_ms();
        let natural = Size::from_pixels(image.width(), image.height());

        info!(
            position_ms,
            width = image.width(),
            height = image.height(),
            "reference frame captured"
        );

        if self.displayed_size.is_none() {
            self.displayed_size = Some(natural);
        }
        if self.crop.is_none() {
            self.crop = Some(DisplayRect::new(
                0.0,
                0.0,
                image.width().min(DEFAULT_CROP_WIDTH) as f64,
                image.height().min(DEFAULT_CROP_HEIGHT) as f64,
            ));
        }

        self.reference = Some(ReferenceFrame { image, position_ms });
        self.recompute_layout();
        self.reference.as_ref().ok_or(CoreError::NoReferenceFrame)
    }

    /// The current crop in source pixels.
    pub fn natural_rect(&self) -> Result<NaturalRect, CoreError> {
        let reference = self.reference.as_ref().ok_or(CoreError::NoReferenceFrame)?;
        let crop = self
            .crop
            .ok_or_else(|| CoreError::InvalidCrop("no crop region selected".into()))?;
        let natural = reference.natural_size();
        let displayed = self.displayed_size.unwrap_or(natural);
        map_to_natural(&crop, displayed, natural, self.media.info().size())
    }

    /// Sample the crop over the time range and replace the frame collection.
    ///
    /// On any error the previous collection is left untouched.
    pub async fn preview_frames(&mut self) -> Result<&FrameCollection, CoreError> {
        let rect = self.natural_rect()?;
        let range = self
            .time_range
            .ok_or_else(|| CoreError::InvalidTimeRange("no time range set".into()))?;

        let frames = match self
            .sampler
            .sample(&mut self.media, rect, range, &mut self.frame_ids)
            .await
        {
            Ok(frames) => frames,
            Err(partial) => {
                warn!(
                    discarded = partial.frames.len(),
                    error = %partial.error,
                    "preview failed, keeping previous frames"
                );
                return Err(partial.error);
            }
        };

        if frames.is_empty() {
            return Err(CoreError::CaptureFailure(
                "no frames were captured, check the time range and crop".into(),
            ));
        }

        self.frames = FrameCollection::from(frames);
        self.recompute_layout();
        info!(
            frames = self.frames.len(),
            frames_per_page = self.layout.frames_per_page(),
            pages = self.page_count(),
            "preview ready"
        );
        Ok(&self.frames)
    }

    /// Remove one previewed frame. Returns `None` if there was none with `id`.
    pub fn delete_frame(&mut self, id: FrameId) -> Option<Frame> {
        let removed = self.frames.remove(id);
        if removed.is_some() {
            debug!(%id, remaining = self.frames.len(), "frame deleted");
        }
        removed
    }

    /// Re-plan frames per page from the crop's aspect ratio. Applies it only
    /// in auto mode; returns the planned value either way, or `None` while
    /// the crop can't be mapped yet.
    pub fn recompute_layout(&mut self) -> Option<u32> {
        let rect = self.natural_rect().ok()?;
        let planned = compute_frames_per_page(
            rect.aspect_ratio(),
            self.layout.frame_width_percent(),
            self.layout.gap_px(),
            &self.page,
        );
        if self.layout.apply_planned(planned) {
            debug!(frames_per_page = planned, "layout recomputed");
        }
        Some(planned)
    }

    /// Build the request `request_export` would send: previewed frames when
    /// there are any, otherwise the crop and time range for the service to
    /// sample.
    pub fn build_export_request(&self) -> Result<ExportRequest, CoreError> {
        let frames_per_page = self.layout.frames_per_page();
        let frame_width_percent = self.layout.frame_width_percent();
        let gap_px = self.layout.gap_px();

        if !self.frames.is_empty() {
            return Ok(ExportRequest::FromFrames(ExtractFromFramesRequest {
                images: self.frames.images(),
                frames_per_page,
                frame_width_percent,
                gap_px,
                title: self.title.clone().unwrap_or_default(),
            }));
        }

        let rect = self.natural_rect()?;
        let range = self
            .time_range
            .ok_or_else(|| CoreError::InvalidTimeRange("no time range set".into()))?;

        Ok(ExportRequest::FromVideo(ExtractFromVideoRequest {
            media_id: self.media_id.clone(),
            x1: rect.x1,
            y1: rect.y1,
            x2: rect.x2,
            y2: rect.y2,
            start_ms: range.start_ms(),
            end_ms: range.end_ms(),
            interval_ms: range.interval_ms(),
            frames_per_page,
            frame_width_percent,
            gap_px,
        }))
    }

    pub async fn request_export<S: ExtractionService>(
        &self,
        service: &S,
    ) -> Result<ExportResult, CoreError> {
        let request = self.build_export_request()?;
        let document = dispatch_export(service, &request).await?;
        info!(bytes = document.len(), "export complete");
        Ok(ExportResult { request, document })
    }

    #[cfg(test)]
    pub(crate) fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }
}
