use std::io::Cursor;
use std::time::Duration;

use image::ImageFormat;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, PartialSample};
use crate::frame::{Frame, FrameIdCounter};
use crate::media::{MediaError, MediaSource, Seeker, DEFAULT_SEEK_TIMEOUT};
use crate::rect::NaturalRect;
use crate::timeline::TimeRange;

/// Parameters for the frame sampler.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// How long to wait for a single seek before giving up on the media.
    pub seek_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            seek_timeout: DEFAULT_SEEK_TIMEOUT,
        }
    }
}

/// Walks a time range, seeking and capturing the crop at each step.
#[derive(Debug)]
pub struct FrameSampler {
    seeker: Seeker,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            seeker: Seeker::new(config.seek_timeout),
        }
    }

    pub fn seeker(&mut self) -> &mut Seeker {
        &mut self.seeker
    }

    /// Capture `rect` at every timestamp of `range`.
    ///
    /// Frames whose capture fails are skipped. If the media becomes
    /// unavailable the run stops and the frames captured so far come back
    /// inside the error. The playback position is restored either way.
    pub async fn sample<M: MediaSource>(
        &mut self,
        media: &mut M,
        rect: NaturalRect,
        range: TimeRange,
        ids: &mut FrameIdCounter,
    ) -> Result<Vec<Frame>, PartialSample> {
        let info = media.info();
        if !rect.fits_within(info.width, info.height) {
            return Err(PartialSample::empty(CoreError::InvalidCrop(format!(
                "crop {rect:?} exceeds media bounds {}x{}",
                info.width, info.height
            ))));
        }

        let saved_position = media.position_ms();
        info!(
            start_ms = range.start_ms(),
            end_ms = range.end_ms(),
            interval_ms = range.interval_ms(),
            expected_frames = range.estimated_frame_count(),
            crop_width = rect.width(),
            crop_height = rect.height(),
            saved_position,
            "sampling started"
        );

        let mut frames = Vec::new();
        let outcome = self
            .collect_frames(media, rect, range, ids, &mut frames)
            .await;

        self.restore_position(media, saved_position).await;

        match outcome {
            Ok(()) => {
                info!(captured = frames.len(), "sampling complete");
                Ok(frames)
            }
            Err(error) => {
                error!(captured = frames.len(), %error, "sampling aborted");
                Err(PartialSample { frames, error })
            }
        }
    }

    async fn collect_frames<M: MediaSource>(
        &mut self,
        media: &mut M,
        rect: NaturalRect,
        range: TimeRange,
        ids: &mut FrameIdCounter,
        frames: &mut Vec<Frame>,
    ) -> Result<(), CoreError> {
        for timestamp_ms in range.timestamps() {
            self.seeker.seek(media, timestamp_ms).await?;

            match capture_encoded(media, rect) {
                Ok(image_data) => {
                    let id = ids.next_id();
                    debug!(%id, timestamp_ms, bytes = image_data.len(), "captured frame");
                    frames.push(Frame {
                        id,
                        image_data,
                        timestamp_ms,
                    });
                }
                Err(MediaError::Capture(reason)) => {
                    warn!(timestamp_ms, %reason, "capture failed, skipping frame");
                }
                Err(e @ MediaError::Unavailable(_)) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn restore_position<M: MediaSource>(&mut self, media: &mut M, position_ms: u64) {
        if media.position_ms() == position_ms {
            return;
        }
        match self.seeker.seek(media, position_ms).await {
            Ok(_) => debug!(position_ms, "playback position restored"),
            Err(error) => warn!(position_ms, %error, "could not restore playback position"),
        }
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

fn capture_encoded<M: MediaSource>(media: &mut M, rect: NaturalRect) -> Result<Vec<u8>, MediaError> {
    let image = media.capture_still(rect)?;
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| MediaError::Capture(format!("png encoding failed: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::frame::FrameId;
    use crate::media::fake::FakeMedia;

    fn crop() -> NaturalRect {
        NaturalRect::new(100, 100, 500, 300).unwrap()
    }

    fn timestamps(frames: &[Frame]) -> Vec<u64> {
        frames.iter().map(|f| f.timestamp_ms).collect()
    }

    fn ids(frames: &[Frame]) -> Vec<u64> {
        frames.iter().map(|f| f.id.0).collect()
    }

    #[tokio::test]
    async fn samples_every_interval() {
        let mut media = FakeMedia::new(10_000);
        let mut sampler = FrameSampler::default();
        let mut counter = FrameIdCounter::new();
        let range = TimeRange::new(0, 3000, 1000).unwrap();

        let frames = sampler
            .sample(&mut media, crop(), range, &mut counter)
            .await
            .unwrap();

        assert_eq!(timestamps(&frames), vec![0, 1000, 2000]);
        assert_eq!(ids(&frames), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn captured_frames_are_png_of_the_crop() {
        let mut media = FakeMedia::new(10_000);
        let mut sampler = FrameSampler::default();
        let range = TimeRange::new(2000, 2500, 1000).unwrap();

        let frames = sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap();

        let image = image::load_from_memory(&frames[0].image_data)
            .unwrap()
            .into_rgb8();
        assert_eq!(image.dimensions(), (400, 200));
        assert_eq!(*image.get_pixel(0, 0), FakeMedia::shade_for(2000));
    }

    #[tokio::test]
    async fn seeks_are_never_concurrent() {
        let mut media = FakeMedia::new(60_000);
        let mut sampler = FrameSampler::default();
        let range = TimeRange::new(0, 20_000, 500).unwrap();

        sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap();

        assert_eq!(media.max_outstanding, 1);
    }

    #[tokio::test]
    async fn restores_playback_position() {
        let mut media = FakeMedia::new(60_000);
        media.set_position(42_000);
        let mut sampler = FrameSampler::default();
        let range = TimeRange::new(1000, 4000, 1000).unwrap();

        sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap();

        assert_eq!(media.position_ms(), 42_000);
        assert_eq!(media.seeks.last(), Some(&42_000));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_capture_is_skipped() {
        let mut media = FakeMedia::new(10_000);
        media.fail_capture_at.insert(1000);
        let mut sampler = FrameSampler::default();
        let range = TimeRange::new(0, 4000, 1000).unwrap();

        let frames = sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap();

        assert_eq!(timestamps(&frames), vec![0, 2000, 3000]);
        assert_eq!(ids(&frames), vec![0, 1, 2]);
        assert!(logs_contain("capture failed, skipping frame"));
    }

    #[tokio::test]
    async fn lost_media_returns_partial_frames() {
        let mut media = FakeMedia::new(10_000);
        media.invalidate_after_seeks = Some(2);
        let mut sampler = FrameSampler::default();
        let range = TimeRange::new(0, 5000, 1000).unwrap();

        let partial = sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap_err();

        assert!(matches!(partial.error, CoreError::MediaUnavailable(_)));
        assert_eq!(timestamps(&partial.frames), vec![0, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_seek_aborts_with_frames_so_far() {
        let mut media = FakeMedia::new(10_000);
        media.hang_at.insert(2000);
        let mut sampler = FrameSampler::new(SamplerConfig {
            seek_timeout: Duration::from_millis(100),
        });
        let range = TimeRange::new(0, 5000, 1000).unwrap();

        let partial = sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap_err();

        assert!(matches!(partial.error, CoreError::MediaUnavailable(_)));
        assert_eq!(timestamps(&partial.frames), vec![0, 1000]);
        // The position is restored after the timed-out seek.
        assert_eq!(media.position_ms(), 0);
    }

    #[tokio::test]
    async fn ids_continue_across_runs() {
        let mut media = FakeMedia::new(10_000);
        let mut sampler = FrameSampler::default();
        let mut counter = FrameIdCounter::new();
        let range = TimeRange::new(0, 2000, 1000).unwrap();

        sampler.sample(&mut media, crop(), range, &mut counter).await.unwrap();
        let second = sampler.sample(&mut media, crop(), range, &mut counter).await.unwrap();

        assert_eq!(second[0].id, FrameId(2));
    }

    #[tokio::test]
    async fn crop_outside_media_is_rejected_before_seeking() {
        let mut media = FakeMedia::with_size(320, 240, 10_000);
        let mut sampler = FrameSampler::default();
        let range = TimeRange::new(0, 2000, 1000).unwrap();

        let partial = sampler
            .sample(&mut media, crop(), range, &mut FrameIdCounter::new())
            .await
            .unwrap_err();

        assert!(matches!(partial.error, CoreError::InvalidCrop(_)));
        assert!(media.seeks.is_empty());
    }
}
