//! Raster page composition: frames stacked vertically and centered, with an
//! optional title and a page label.

use std::io::Cursor;

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, info, warn};

use crate::config::PageSpec;
use crate::error::CoreError;
use crate::layout::{compute_page_count, LayoutParams};

const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\malgun.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font sizes in points.
const TITLE_POINTS: f64 = 16.0;
const LABEL_POINTS: f64 = 10.0;
/// Distance of the page label below the bottom margin line, in points.
const LABEL_OFFSET_POINTS: f64 = 10.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TITLE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([0x99, 0x99, 0x99]);

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub frames_per_page: u32,
    pub frame_width_percent: u32,
    /// Gap between frames, in points.
    pub gap_px: u32,
    pub title: Option<String>,
    pub dpi: f64,
}

impl ComposeOptions {
    pub fn from_layout(layout: &LayoutParams, title: Option<String>, dpi: f64) -> Self {
        Self {
            frames_per_page: layout.frames_per_page(),
            frame_width_percent: layout.frame_width_percent(),
            gap_px: layout.gap_px(),
            title: title.filter(|t| !t.is_empty()),
            dpi,
        }
    }
}

/// Lays frames out on pages of a fixed geometry.
pub struct PageComposer {
    page: PageSpec,
    font: Option<FontVec>,
}

impl PageComposer {
    pub fn new(page: PageSpec) -> Self {
        Self {
            page,
            font: load_font(),
        }
    }

    /// A composer that draws frames only, no title or page labels.
    pub fn without_text(page: PageSpec) -> Self {
        Self { page, font: None }
    }

    pub fn compose(
        &self,
        frames: &[RgbImage],
        options: &ComposeOptions,
    ) -> Result<Vec<RgbImage>, CoreError> {
        let Some(first) = frames.first() else {
            return Err(CoreError::ExportFailure("no frames to render".into()));
        };

        let scale = PageSpec::checked_scale(options.dpi)
            .map_err(|e| CoreError::ExportFailure(e.to_string()))?;
        let page_w = (self.page.width * scale) as u32;
        let page_h = (self.page.height * scale) as u32;
        let margin = (self.page.margin * scale) as u32;
        let title_h = if options.title.is_some() {
            (self.page.header_height * scale) as u32
        } else {
            0
        };
        let gap = (options.gap_px as f64 * scale) as u32;
        let per_page = options.frames_per_page.max(1);

        let available_w = page_w.saturating_sub(margin.saturating_mul(2));
        let available_h = page_h.saturating_sub(margin.saturating_mul(2).saturating_add(title_h));
        let (frame_w, frame_h) = target_frame_size(
            first.dimensions(),
            available_w,
            available_h,
            options.frame_width_percent,
            gap,
            per_page,
        );

        info!(
            frames = frames.len(),
            per_page,
            page_w,
            page_h,
            frame_w,
            frame_h,
            dpi = options.dpi,
            "composing pages"
        );

        let resized: Vec<RgbImage> = frames
            .iter()
            .map(|f| imageops::resize(f, frame_w, frame_h, FilterType::Lanczos3))
            .collect();

        let total_pages = compute_page_count(resized.len(), per_page);
        let mut pages = Vec::with_capacity(total_pages);

        for (index, chunk) in resized.chunks(per_page as usize).enumerate() {
            let mut page = RgbImage::from_pixel(page_w, page_h, BACKGROUND);
            let mut y = margin as i64;

            if let Some(title) = &options.title {
                self.draw_centered(&mut page, title, TITLE_POINTS * scale, y, TITLE_COLOR);
                y += title_h as i64;
            }

            for frame in chunk {
                let x = (page_w.saturating_sub(frame.width()) / 2) as i64;
                imageops::overlay(&mut page, frame, x, y);
                y += (frame.height() + gap) as i64;
            }

            let label = format!("{} / {}", index + 1, total_pages);
            let label_y = page_h.saturating_sub(margin) as i64 + (LABEL_OFFSET_POINTS * scale) as i64;
            self.draw_centered(&mut page, &label, LABEL_POINTS * scale, label_y, LABEL_COLOR);

            debug!(page = index + 1, frames = chunk.len(), "page composed");
            pages.push(page);
        }

        Ok(pages)
    }

    fn draw_centered(&self, img: &mut RgbImage, text: &str, px: f64, y: i64, color: Rgb<u8>) {
        let Some(font) = &self.font else { return };
        let scale = PxScale::from(px as f32);
        let (text_w, _) = text_size(scale, font, text);
        let x = (img.width() as i64 - text_w as i64) / 2;
        draw_text_mut(img, color, x.max(0) as i32, y as i32, scale, font, text);
    }
}

/// Width-constrained size unless `per_page` of those overflow the page, in
/// which case the frames shrink to fill the available height.
fn target_frame_size(
    (src_w, src_h): (u32, u32),
    available_w: u32,
    available_h: u32,
    width_percent: u32,
    gap: u32,
    per_page: u32,
) -> (u32, u32) {
    let aspect = src_h.max(1) as f64 / src_w.max(1) as f64;
    let width = (available_w as f64 * width_percent as f64 / 100.0) as u64;
    let height = (width as f64 * aspect) as u64;
    let gaps = gap as u64 * (per_page as u64 - 1);

    if height * per_page as u64 + gaps <= available_h as u64 {
        return (width.max(1) as u32, height.max(1) as u32);
    }

    let height = ((available_h as u64).saturating_sub(gaps) / per_page as u64).max(1);
    let width = ((height as f64 / aspect) as u64).max(1);
    debug!(width, height, "frames limited by page height");
    (width as u32, height as u32)
}

/// Decode encoded frames, skipping any that fail.
pub fn decode_frames(images: &[Vec<u8>]) -> Vec<RgbImage> {
    images
        .iter()
        .enumerate()
        .filter_map(|(index, bytes)| match image::load_from_memory(bytes) {
            Ok(img) => Some(img.into_rgb8()),
            Err(e) => {
                warn!(index, error = %e, "skipping undecodable frame");
                None
            }
        })
        .collect()
}

/// PNG-encode each page.
pub fn encode_pages(pages: &[RgbImage]) -> Result<Vec<Vec<u8>>, CoreError> {
    pages
        .iter()
        .map(|page| {
            let mut buf = Vec::new();
            page.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| CoreError::ExportFailure(format!("failed to encode page: {e}")))?;
            Ok(buf)
        })
        .collect()
}

fn load_font() -> Option<FontVec> {
    for path in FONT_PATHS {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                debug!(path, error = %e, "font not readable");
                continue;
            }
        };
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                info!(path, "loaded page font");
                return Some(font);
            }
            Err(e) => warn!(path, error = %e, "failed to parse font file"),
        }
    }
    warn!("no usable font found, titles and page labels will be omitted");
    None
}
