use tracing::debug;

use crate::error::CoreError;

/// Width and height of an image, in pixels of whatever space it lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A crop rectangle in displayed (on-screen preview) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp a negative origin to zero and reject empty or non-finite rectangles.
    pub fn normalized(self) -> Result<DisplayRect, CoreError> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CoreError::InvalidCrop(format!(
                "non-finite crop coordinates: {self:?}"
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(CoreError::InvalidCrop(format!(
                "crop must have a positive size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(DisplayRect {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
            ..self
        })
    }
}

/// A crop rectangle in source-resolution pixels, as half-open corner
/// coordinates. Always satisfies `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl NaturalRect {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self, CoreError> {
        if x1 >= x2 || y1 >= y2 {
            return Err(CoreError::InvalidCrop(format!(
                "({x1},{y1}) to ({x2},{y2}) has no area"
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// The whole frame of a `width` x `height` source.
    pub fn full(width: u32, height: u32) -> Result<Self, CoreError> {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f64 {
        self.height() as f64 / self.width() as f64
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x2 <= width && self.y2 <= height
    }
}

/// Map a crop drawn on a scaled preview back to source pixels, clamped to
/// `bounds`.
pub fn map_to_natural(
    rect: &DisplayRect,
    displayed: Size,
    natural: Size,
    bounds: Size,
) -> Result<NaturalRect, CoreError> {
    if !displayed.is_positive() {
        return Err(CoreError::InvalidCrop(format!(
            "displayed image size must be positive, got {}x{}",
            displayed.width, displayed.height
        )));
    }
    if !natural.is_positive() || !bounds.is_positive() {
        return Err(CoreError::InvalidCrop(format!(
            "natural size {}x{} / bounds {}x{} must be positive",
            natural.width, natural.height, bounds.width, bounds.height
        )));
    }

    let scale_x = natural.width / displayed.width;
    let scale_y = natural.height / displayed.height;

    let x1 = (rect.x * scale_x).round().max(0.0);
    let y1 = (rect.y * scale_y).round().max(0.0);
    let x2 = ((rect.x + rect.width) * scale_x).round().min(bounds.width);
    let y2 = ((rect.y + rect.height) * scale_y).round().min(bounds.height);

    // NaN fails every comparison, so test for the valid case.
    if !(x1 < x2 && y1 < y2) {
        return Err(CoreError::InvalidCrop(format!(
            "mapped crop ({x1},{y1}) to ({x2},{y2}) has no area"
        )));
    }

    debug!(scale_x, scale_y, x1, y1, x2, y2, "mapped crop to natural space");

    NaturalRect::new(x1 as u32, y1 as u32, x2 as u32, y2 as u32)
}
