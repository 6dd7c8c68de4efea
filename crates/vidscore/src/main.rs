mod cli;
mod render;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use prost::Message;
use tracing::{info, warn};

use vidscore_core::debug::save_crop_overlay;
use vidscore_core::media::ffmpeg::FfmpegMediaSource;
use vidscore_core::{
    DisplayRect, ExportRequest, MediaSource, PageSpec, SamplerConfig, Session, Size,
};
use vidscore_proto::proto::RenderedDocument;

use crate::render::LocalRenderer;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Probe { input } => {
            let media = FfmpegMediaSource::open(&input)?;
            let media_info = media.info();
            println!(
                "{}: {}x{}, {} ms",
                input.display(),
                media_info.width,
                media_info.height,
                media_info.duration_ms
            );
            Ok(())
        }
        cli::Command::Extract {
            input,
            output,
            crop,
            display,
            start,
            end,
            interval,
            frames_per_page,
            width_percent,
            gap,
            title,
            direct,
            dpi,
            seek_timeout_ms,
            debug_reference,
        } => {
            info!(?input, ?output, ?crop, start, ?end, interval, direct, "starting extraction");

            let sampler_config = SamplerConfig {
                seek_timeout: Duration::from_millis(seek_timeout_ms),
            };
            let options = ExtractOptions {
                input,
                output,
                crop: DisplayRect::new(crop.x, crop.y, crop.width, crop.height),
                display: display.map(|d| Size::new(d.width, d.height)),
                start,
                end,
                interval,
                frames_per_page,
                width_percent,
                gap,
                title,
                direct,
                dpi,
                sampler_config,
                debug_reference,
            };

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .context("failed to start runtime")?;
            runtime.block_on(extract(options))
        }
    }
}

struct ExtractOptions {
    input: PathBuf,
    output: PathBuf,
    crop: DisplayRect,
    display: Option<Size>,
    start: u64,
    end: Option<u64>,
    interval: u64,
    frames_per_page: Option<u32>,
    width_percent: u32,
    gap: u32,
    title: Option<String>,
    direct: bool,
    dpi: f64,
    sampler_config: SamplerConfig,
    debug_reference: Option<PathBuf>,
}

async fn extract(options: ExtractOptions) -> Result<()> {
    let media = FfmpegMediaSource::open(&options.input)?;
    let end = options.end.unwrap_or(media.info().duration_ms);
    let media_id = options.input.to_string_lossy().into_owned();

    let mut session = Session::new(media, media_id)
        .with_title(options.title)
        .with_sampler_config(options.sampler_config.clone());

    session
        .capture_reference_frame()
        .await
        .context("failed to capture reference frame")?;
    if let Some(size) = options.display {
        session.set_displayed_size(size)?;
    }
    session.set_crop_region(options.crop)?;
    session.set_time_range(options.start, end, options.interval)?;
    session.set_frame_width_percent(options.width_percent)?;
    session.set_gap_px(options.gap);
    if let Some(n) = options.frames_per_page {
        session.set_frames_per_page(n)?;
    }

    if let Some(path) = &options.debug_reference {
        if let Some(reference) = session.reference() {
            save_crop_overlay(&reference.image, session.natural_rect()?, path)?;
        }
    }

    if options.direct {
        info!("skipping preview, the renderer samples the video");
    } else {
        let frames = session.preview_frames().await.context("preview failed")?;
        info!(frames = frames.len(), pages = session.page_count(), "preview complete");
    }

    let renderer = LocalRenderer::new(PageSpec::default(), options.dpi, options.sampler_config);
    let result = session
        .request_export(&renderer)
        .await
        .context("could not render document")?;

    let document =
        RenderedDocument::decode(result.document.as_slice()).context("failed to decode document")?;
    if document.pages.is_empty() {
        warn!("rendered document has no pages");
    }
    write_pages(&document, &options.output)?;
    write_request(&result.request, &options.output.join("request.pb"))?;

    info!(
        page_count = document.page_count,
        output = ?options.output,
        "extraction complete"
    );
    Ok(())
}

fn write_pages(document: &RenderedDocument, output: &Path) -> Result<()> {
    std::fs::create_dir_all(output).context("failed to create output directory")?;

    for (i, page) in document.pages.iter().enumerate() {
        let path = output.join(format!("page_{:03}.png", i + 1));
        std::fs::write(&path, page)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    info!(?output, pages = document.pages.len(), "pages written");
    Ok(())
}

/// Serialize the export request as length-delimited protobuf and write to file.
fn write_request(request: &ExportRequest, output: &Path) -> Result<()> {
    let mut buf = Vec::new();
    match request {
        ExportRequest::FromFrames(req) => req.encode_length_delimited(&mut buf),
        ExportRequest::FromVideo(req) => req.encode_length_delimited(&mut buf),
    }
    .context("failed to encode export request")?;

    std::fs::write(output, &buf)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(?output, bytes = buf.len(), "export request written");
    Ok(())
}
