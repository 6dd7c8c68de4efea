use tracing::{debug, warn};

use crate::config::PageSpec;
use crate::error::CoreError;

/// Search cap for frames stacked on one page.
pub const MAX_FRAMES_PER_PAGE: u32 = 20;

pub const MIN_FRAME_WIDTH_PERCENT: u32 = 70;
pub const MAX_FRAME_WIDTH_PERCENT: u32 = 100;

/// Whether `frames_per_page` follows the planner or stays where the user put it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramesPerPageMode {
    #[default]
    Auto,
    Manual,
}

/// How frames are placed on output pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParams {
    frames_per_page: u32,
    frame_width_percent: u32,
    gap_px: u32,
    mode: FramesPerPageMode,
}

impl LayoutParams {
    pub fn new(
        frames_per_page: u32,
        frame_width_percent: u32,
        gap_px: u32,
        mode: FramesPerPageMode,
    ) -> Result<Self, CoreError> {
        let mut params = Self::default();
        params.set_frame_width_percent(frame_width_percent)?;
        params.gap_px = gap_px;
        params.mode = mode;
        if frames_per_page == 0 {
            return Err(CoreError::InvalidLayout(
                "frames per page must be at least 1".into(),
            ));
        }
        params.frames_per_page = frames_per_page;
        Ok(params)
    }

    pub fn frames_per_page(&self) -> u32 {
        self.frames_per_page
    }

    pub fn frame_width_percent(&self) -> u32 {
        self.frame_width_percent
    }

    pub fn gap_px(&self) -> u32 {
        self.gap_px
    }

    pub fn mode(&self) -> FramesPerPageMode {
        self.mode
    }

    pub fn set_frame_width_percent(&mut self, percent: u32) -> Result<(), CoreError> {
        if !(MIN_FRAME_WIDTH_PERCENT..=MAX_FRAME_WIDTH_PERCENT).contains(&percent) {
            return Err(CoreError::InvalidLayout(format!(
                "frame width must be {MIN_FRAME_WIDTH_PERCENT}-{MAX_FRAME_WIDTH_PERCENT}%, got {percent}%"
            )));
        }
        self.frame_width_percent = percent;
        Ok(())
    }

    pub fn set_gap_px(&mut self, gap_px: u32) {
        self.gap_px = gap_px;
    }

    /// Pin `frames_per_page`; the planner stops overriding it.
    pub fn set_manual_frames_per_page(&mut self, frames_per_page: u32) -> Result<(), CoreError> {
        if frames_per_page == 0 {
            return Err(CoreError::InvalidLayout(
                "frames per page must be at least 1".into(),
            ));
        }
        self.frames_per_page = frames_per_page;
        self.mode = FramesPerPageMode::Manual;
        Ok(())
    }

    pub fn set_auto(&mut self) {
        self.mode = FramesPerPageMode::Auto;
    }

    /// Take a planned value. Ignored in manual mode.
    pub(crate) fn apply_planned(&mut self, frames_per_page: u32) -> bool {
        if self.mode == FramesPerPageMode::Manual {
            return false;
        }
        self.frames_per_page = frames_per_page.max(1);
        true
    }
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            frames_per_page: 1,
            frame_width_percent: 95,
            gap_px: 10,
            mode: FramesPerPageMode::Auto,
        }
    }
}

/// Largest number of frames with the given height/width ratio that stack on
/// one page without overflowing. Never less than 1.
///
/// `gap_px` is in page units (points), like `page`.
pub fn compute_frames_per_page(
    aspect_ratio: f64,
    frame_width_percent: u32,
    gap_px: u32,
    page: &PageSpec,
) -> u32 {
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        warn!(aspect_ratio, "unusable aspect ratio, using one frame per page");
        return 1;
    }

    let target_width = page.available_width() * frame_width_percent as f64 / 100.0;
    let target_height = target_width * aspect_ratio;
    let limit = page.available_height() - page.safety_margin;
    let gap = gap_px as f64;

    let mut best = 1;
    for n in 1..=MAX_FRAMES_PER_PAGE {
        let total = target_height * n as f64 + gap * (n - 1) as f64;
        if total > limit {
            break;
        }
        best = n;
    }

    debug!(
        aspect_ratio,
        frame_width_percent,
        gap_px,
        target_height,
        limit,
        frames_per_page = best,
        "planned frames per page"
    );
    best
}

/// Pages needed for `total_frames` at `frames_per_page` each.
pub fn compute_page_count(total_frames: usize, frames_per_page: u32) -> usize {
    total_frames.div_ceil(frames_per_page.max(1) as usize)
}
