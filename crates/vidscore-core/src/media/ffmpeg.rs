//! Media source backed by the ffmpeg command-line tools.
//!
//! Each seek decodes one RGB24 frame at the requested position on the
//! blocking pool and reports it back over a channel tagged with the seek id.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use super::{MediaError, MediaInfo, MediaSource, SeekCompleted, SeekRequest};
use crate::rect::NaturalRect;

fn probe(path: &Path) -> Result<MediaInfo> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height:format=duration",
            "-of", "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run ffprobe, is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {stderr}");
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `key=value` lines for width, height and duration (seconds).
fn parse_probe_output(stdout: &str) -> Result<MediaInfo> {
    let mut width = None;
    let mut height = None;
    let mut duration_ms = None;

    for line in stdout.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = Some(value.parse::<u32>().context("failed to parse width")?),
            "height" => height = Some(value.parse::<u32>().context("failed to parse height")?),
            "duration" => match value.parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs >= 0.0 => {
                    duration_ms = Some((secs * 1000.0).round() as u64)
                }
                _ => warn!(value, "unreadable duration, treating as unknown"),
            },
            _ => {}
        }
    }

    let (Some(width), Some(height)) = (width, height) else {
        error!(%stdout, "ffprobe output is missing width or height");
        bail!("unexpected ffprobe output: {stdout}");
    };
    if width == 0 || height == 0 {
        bail!("invalid video dimensions: {width}x{height}");
    }

    let info = MediaInfo {
        width,
        height,
        duration_ms: duration_ms.unwrap_or(0),
    };
    info!(width, height, duration_ms = info.duration_ms, "probe completed");
    Ok(info)
}

/// Decode the frame shown at `position_ms`. `Ok(None)` when ffmpeg produced
/// no frame there, e.g. past the end of the stream.
fn decode_frame_at(path: &Path, position_ms: u64, width: u32, height: u32) -> Result<Option<RgbImage>> {
    let seconds = format!("{:.3}", position_ms as f64 / 1000.0);

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &seconds, "-i"])
        .arg(path)
        .args([
            "-frames:v", "1",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to spawn ffmpeg, is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(%stderr, position_ms, "ffmpeg could not decode a frame");
        return Ok(None);
    }

    let frame_bytes = (width as usize) * (height as usize) * 3;
    if output.stdout.len() < frame_bytes {
        warn!(
            read_bytes = output.stdout.len(),
            expected_bytes = frame_bytes,
            position_ms,
            "no complete frame at position"
        );
        return Ok(None);
    }

    let mut buf = output.stdout;
    buf.truncate(frame_bytes);
    let image = RgbImage::from_raw(width, height, buf)
        .context("failed to create RgbImage from raw frame data")?;
    debug!(position_ms, "decoded frame");
    Ok(Some(image))
}

struct DecodedSeek {
    request: SeekRequest,
    frame: Result<Option<RgbImage>>,
}

/// A local video file opened through ffprobe/ffmpeg.
pub struct FfmpegMediaSource {
    path: PathBuf,
    info: MediaInfo,
    position_ms: u64,
    current: Option<RgbImage>,
    events_tx: UnboundedSender<DecodedSeek>,
    events_rx: UnboundedReceiver<DecodedSeek>,
}

impl FfmpegMediaSource {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("video file does not exist: {}", path.display());
        }
        let info = probe(path)?;
        let (events_tx, events_rx) = unbounded_channel();

        info!(?path, width = info.width, height = info.height, "media source opened");

        Ok(Self {
            path: path.to_path_buf(),
            info,
            position_ms: 0,
            current: None,
            events_tx,
            events_rx,
        })
    }
}

impl MediaSource for FfmpegMediaSource {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn request_seek(&mut self, request: SeekRequest) -> Result<(), MediaError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MediaError::Unavailable(format!("no async runtime for decoding: {e}")))?;

        let path = self.path.clone();
        let (width, height) = (self.info.width, self.info.height);
        let tx = self.events_tx.clone();

        runtime.spawn_blocking(move || {
            let frame = decode_frame_at(&path, request.position_ms, width, height);
            // The receiver lives as long as the source; a send error means
            // the source was dropped mid-seek.
            let _ = tx.send(DecodedSeek { request, frame });
        });
        Ok(())
    }

    async fn next_seek_event(&mut self) -> Result<SeekCompleted, MediaError> {
        let Some(decoded) = self.events_rx.recv().await else {
            return Err(MediaError::Unavailable("decoder channel closed".into()));
        };

        let frame = decoded
            .frame
            .map_err(|e| MediaError::Unavailable(format!("{e:#}")))?;

        self.position_ms = decoded.request.position_ms;
        self.current = frame;

        Ok(SeekCompleted {
            id: decoded.request.id,
            position_ms: decoded.request.position_ms,
        })
    }

    fn capture_still(&mut self, rect: NaturalRect) -> Result<RgbImage, MediaError> {
        let frame = self.current.as_ref().ok_or_else(|| {
            MediaError::Capture(format!("no decoded frame at {}ms", self.position_ms))
        })?;
        if !rect.fits_within(frame.width(), frame.height()) {
            return Err(MediaError::Capture(format!(
                "crop {rect:?} exceeds frame {}x{}",
                frame.width(),
                frame.height()
            )));
        }
        Ok(image::imageops::crop_imm(frame, rect.x1, rect.y1, rect.width(), rect.height()).to_image())
    }
}
