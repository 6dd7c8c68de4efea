use crate::error::CoreError;

/// Resolution pages are rendered at unless told otherwise.
pub const DEFAULT_DPI: f64 = 300.0;

/// Highest resolution pages may be rendered at.
pub const MAX_DPI: f64 = 1200.0;

/// PostScript points per inch; `PageSpec` values are in points.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Fixed output page geometry, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub width: f64,
    pub height: f64,
    /// Applied on all four sides.
    pub margin: f64,
    /// Reserved above the frames for the document title.
    pub header_height: f64,
    /// Reserved below the frames. The page label sits inside the bottom
    /// margin, so A4 reserves nothing here.
    pub footer_height: f64,
    /// Slack kept free below the last frame when planning.
    pub safety_margin: f64,
}

impl PageSpec {
    /// ISO A4 portrait.
    pub const A4: PageSpec = PageSpec {
        width: 595.0,
        height: 842.0,
        margin: 40.0,
        header_height: 30.0,
        footer_height: 0.0,
        safety_margin: 10.0,
    };

    pub fn available_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn available_height(&self) -> f64 {
        self.height - 2.0 * self.margin - self.header_height - self.footer_height
    }

    /// Pixels per point at `dpi`.
    pub fn scale_for(dpi: f64) -> f64 {
        dpi / POINTS_PER_INCH
    }

    /// Like [`PageSpec::scale_for`], but rejects a dpi outside
    /// `(0, MAX_DPI]`, NaN included.
    pub fn checked_scale(dpi: f64) -> Result<f64, CoreError> {
        if !(dpi.is_finite() && dpi > 0.0 && dpi <= MAX_DPI) {
            return Err(CoreError::InvalidLayout(format!(
                "dpi must be in (0, {MAX_DPI}], got {dpi}"
            )));
        }
        Ok(Self::scale_for(dpi))
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::A4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_available_area() {
        let page = PageSpec::A4;
        assert_eq!(page.available_width(), 515.0);
        assert_eq!(page.available_height(), 732.0);
    }

    #[test]
    fn a4_at_300_dpi_matches_print_size() {
        let scale = PageSpec::scale_for(DEFAULT_DPI);
        assert_eq!((PageSpec::A4.width * scale) as u32, 2479);
        assert_eq!((PageSpec::A4.height * scale) as u32, 3508);
    }

    #[test]
    fn dpi_outside_supported_range_is_rejected() {
        for dpi in [0.0, -72.0, f64::NAN, f64::INFINITY, 1200.5, 1e12] {
            assert!(
                matches!(PageSpec::checked_scale(dpi), Err(CoreError::InvalidLayout(_))),
                "{dpi}"
            );
        }
        assert_eq!(PageSpec::checked_scale(72.0).unwrap(), 1.0);
        assert!(PageSpec::checked_scale(MAX_DPI).is_ok());
    }
}
