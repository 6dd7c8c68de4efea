use std::path::Path;

use anyhow::{Context, Result};
use prost::Message;
use tracing::info;

use vidscore_core::compose::{decode_frames, encode_pages, ComposeOptions, PageComposer};
use vidscore_core::layout::LayoutParams;
use vidscore_core::media::ffmpeg::FfmpegMediaSource;
use vidscore_core::{
    ExtractionService, FramesPerPageMode, FrameIdCounter, FrameSampler, NaturalRect, PageSpec,
    SamplerConfig, ServiceError, TimeRange,
};
use vidscore_proto::proto::{ExtractFromFramesRequest, ExtractFromVideoRequest, RenderedDocument};

/// Extraction service that renders pages on this machine.
pub struct LocalRenderer {
    composer: PageComposer,
    dpi: f64,
    sampler_config: SamplerConfig,
}

impl LocalRenderer {
    pub fn new(page: PageSpec, dpi: f64, sampler_config: SamplerConfig) -> Self {
        Self {
            composer: PageComposer::new(page),
            dpi,
            sampler_config,
        }
    }

    fn render(
        &self,
        images: &[Vec<u8>],
        layout: &LayoutParams,
        title: Option<String>,
    ) -> Result<Vec<u8>, ServiceError> {
        let frames = decode_frames(images);
        let options = ComposeOptions::from_layout(layout, title, self.dpi);
        let pages = self
            .composer
            .compose(&frames, &options)
            .and_then(|pages| encode_pages(&pages))
            .map_err(|e| ServiceError::new(e.to_string()))?;

        info!(pages = pages.len(), "document rendered");
        Ok(RenderedDocument {
            page_count: pages.len() as u32,
            pages,
        }
        .encode_to_vec())
    }

    async fn sample_video(&self, request: &ExtractFromVideoRequest) -> Result<Vec<Vec<u8>>> {
        let mut media = FfmpegMediaSource::open(Path::new(&request.media_id))?;
        let rect = NaturalRect::new(request.x1, request.y1, request.x2, request.y2)?;
        let range = TimeRange::new(request.start_ms, request.end_ms, request.interval_ms)?;

        let frames = FrameSampler::new(self.sampler_config.clone())
            .sample(&mut media, rect, range, &mut FrameIdCounter::new())
            .await
            .context("sampling failed")?;
        Ok(frames.into_iter().map(|f| f.image_data).collect())
    }
}

fn layout_from(
    frames_per_page: u32,
    frame_width_percent: u32,
    gap_px: u32,
) -> Result<LayoutParams, ServiceError> {
    LayoutParams::new(
        frames_per_page,
        frame_width_percent,
        gap_px,
        FramesPerPageMode::Manual,
    )
    .map_err(|e| ServiceError::new(e.to_string()))
}

impl ExtractionService for LocalRenderer {
    async fn extract_from_video(
        &self,
        request: &ExtractFromVideoRequest,
    ) -> Result<Vec<u8>, ServiceError> {
        let layout = layout_from(
            request.frames_per_page,
            request.frame_width_percent,
            request.gap_px,
        )?;
        let images = self
            .sample_video(request)
            .await
            .map_err(|e| ServiceError::new(format!("{e:#}")))?;
        self.render(&images, &layout, None)
    }

    async fn extract_from_frames(
        &self,
        request: &ExtractFromFramesRequest,
    ) -> Result<Vec<u8>, ServiceError> {
        let layout = layout_from(
            request.frames_per_page,
            request.frame_width_percent,
            request.gap_px,
        )?;
        self.render(&request.images, &layout, Some(request.title.clone()))
    }
}
