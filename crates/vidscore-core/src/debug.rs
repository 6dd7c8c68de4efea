use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::rect::NaturalRect;

const CROP_COLOR: Rgb<u8> = Rgb([255, 0, 64]);

/// Thickness of the crop outline, in pixels.
const CROP_LINE: u32 = 3;

/// Copy of `reference` with `crop` outlined, for checking a crop by eye.
pub fn render_crop_overlay(reference: &RgbImage, crop: NaturalRect) -> RgbImage {
    let mut img = reference.clone();
    for inset in 0..CROP_LINE {
        let w = crop.width().saturating_sub(2 * inset);
        let h = crop.height().saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((crop.x1 + inset) as i32, (crop.y1 + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut img, rect, CROP_COLOR);
    }
    img
}

pub fn save_crop_overlay(reference: &RgbImage, crop: NaturalRect, path: &Path) -> Result<()> {
    render_crop_overlay(reference, crop)
        .save(path)
        .with_context(|| format!("failed to save crop overlay to {}", path.display()))?;
    debug!(?path, "saved crop overlay");
    Ok(())
}
