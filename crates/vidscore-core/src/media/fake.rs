//! Scripted in-memory media source for tests.

use std::collections::{HashSet, VecDeque};

use image::{Rgb, RgbImage};

use super::{MediaError, MediaInfo, MediaSource, SeekCompleted, SeekId, SeekRequest};
use crate::rect::NaturalRect;

pub(crate) struct FakeMedia {
    info: MediaInfo,
    position_ms: u64,
    events: VecDeque<SeekCompleted>,
    outstanding: usize,
    pub(crate) max_outstanding: usize,
    pub(crate) seeks: Vec<u64>,
    pub(crate) captures: Vec<u64>,
    /// Positions whose capture fails with a draw error.
    pub(crate) fail_capture_at: HashSet<u64>,
    /// Positions whose seek never completes.
    pub(crate) hang_at: HashSet<u64>,
    /// Every seek after this many accepted seeks fails as unavailable.
    pub(crate) invalidate_after_seeks: Option<usize>,
    /// Deliver a completion with a foreign id ahead of each real one.
    pub(crate) stale_before_each: bool,
    /// No frame can be captured until a seek has completed.
    pub(crate) blank_until_seek: bool,
    decoded: bool,
}

impl FakeMedia {
    pub(crate) fn new(duration_ms: u64) -> Self {
        Self::with_size(1920, 1080, duration_ms)
    }

    pub(crate) fn with_size(width: u32, height: u32, duration_ms: u64) -> Self {
        Self {
            info: MediaInfo {
                width,
                height,
                duration_ms,
            },
            position_ms: 0,
            events: VecDeque::new(),
            outstanding: 0,
            max_outstanding: 0,
            seeks: Vec::new(),
            captures: Vec::new(),
            fail_capture_at: HashSet::new(),
            hang_at: HashSet::new(),
            invalidate_after_seeks: None,
            stale_before_each: false,
            blank_until_seek: false,
            decoded: false,
        }
    }

    pub(crate) fn set_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms;
    }

    fn invalidated(&self) -> bool {
        self.invalidate_after_seeks
            .is_some_and(|limit| self.seeks.len() >= limit)
    }

    /// Red channel encodes the position in seconds so tests can tell
    /// frames apart.
    pub(crate) fn shade_for(position_ms: u64) -> Rgb<u8> {
        Rgb([(position_ms / 1000 % 256) as u8, 80, 160])
    }
}

impl MediaSource for FakeMedia {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn request_seek(&mut self, request: SeekRequest) -> Result<(), MediaError> {
        if self.invalidated() {
            return Err(MediaError::Unavailable("media handle was closed".into()));
        }
        self.seeks.push(request.position_ms);
        self.outstanding += 1;
        self.max_outstanding = self.max_outstanding.max(self.outstanding);

        if self.stale_before_each {
            self.events.push_back(SeekCompleted {
                id: SeekId(u64::MAX),
                position_ms: 0,
            });
        }
        if !self.hang_at.contains(&request.position_ms) {
            self.events.push_back(SeekCompleted {
                id: request.id,
                position_ms: request.position_ms,
            });
        }
        Ok(())
    }

    async fn next_seek_event(&mut self) -> Result<SeekCompleted, MediaError> {
        let Some(event) = self.events.pop_front() else {
            if self.invalidated() {
                return Err(MediaError::Unavailable("media handle was closed".into()));
            }
            return std::future::pending().await;
        };
        if event.id != SeekId(u64::MAX) {
            self.outstanding -= 1;
            self.position_ms = event.position_ms;
            self.decoded = true;
        }
        Ok(event)
    }

    fn capture_still(&mut self, rect: NaturalRect) -> Result<RgbImage, MediaError> {
        if self.blank_until_seek && !self.decoded {
            return Err(MediaError::Capture(format!(
                "no decoded frame at {}ms",
                self.position_ms
            )));
        }
        if self.fail_capture_at.contains(&self.position_ms) {
            return Err(MediaError::Capture(format!(
                "draw failed at {}ms",
                self.position_ms
            )));
        }
        self.captures.push(self.position_ms);
        Ok(RgbImage::from_pixel(
            rect.width(),
            rect.height(),
            Self::shade_for(self.position_ms),
        ))
    }
}
