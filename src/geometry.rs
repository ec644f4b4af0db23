//! Millimeter and point conversions driven by device DPI.
//!
//! Every physical dimension entering the crate (label stock sizes, border
//! areas, font sizes) is millimeters or points; everything internal is pixels.

/// Convert millimeters to pixels at the given DPI, rounding to nearest.
pub fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    if mm <= 0.0 {
        return 0;
    }
    (mm / 25.4 * dpi as f32).round() as u32
}

/// Convert points (1/72 inch) to pixels at the given DPI, rounding to nearest.
pub fn pt_to_px(pt: f32, dpi: u32) -> u32 {
    if pt <= 0.0 {
        return 0;
    }
    (pt * dpi as f32 / 72.0).round() as u32
}

/// Convert points to fractional pixels. Used for leading arithmetic where
/// repeated rounding would accumulate error.
pub fn pt_to_px_f(pt: f32, dpi: u32) -> f32 {
    pt * dpi as f32 / 72.0
}
