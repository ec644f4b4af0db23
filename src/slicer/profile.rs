//! Per-row ink statistics over a bitmap region.
//!
//! Classifies every row of a fragment as blank, heavy (near-solid, a proxy
//! for ruled table lines) or in between, with an ink density in `[0, 1]`.
//! The fragment is cropped to its horizontal ink bounding box first so border
//! decorations and paper margins do not skew density on sparse rows.

use image::RgbImage;
use rayon::prelude::*;

/// Classification knobs. The defaults are tuned for 300 dpi text on white.
#[derive(Debug, Clone, Copy)]
pub struct ProfileParams {
    /// Gray levels at or above this count as paper.
    pub white_threshold: u8,
    /// A row with at most this fraction of ink counts as blank.
    pub max_ink_fraction: f32,
    /// Horizontal sampling stride.
    pub downsample: u32,
}

impl Default for ProfileParams {
    fn default() -> Self {
        ProfileParams {
            white_threshold: 250,
            max_ink_fraction: 0.01,
            downsample: 4,
        }
    }
}

/// One entry per row of the analyzed region.
#[derive(Debug, Clone, Default)]
pub struct RowProfile {
    pub blank: Vec<bool>,
    pub heavy: Vec<bool>,
    pub density: Vec<f32>,
}

impl RowProfile {
    pub fn len(&self) -> usize {
        self.blank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blank.is_empty()
    }

    /// Index of the last row containing ink, if any.
    pub fn last_ink_row(&self) -> Option<u32> {
        self.blank.iter().rposition(|&b| !b).map(|y| y as u32)
    }
}

fn luma(px: &image::Rgb<u8>) -> u8 {
    let [r, g, b] = px.0;
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Analyze `region` row by row.
pub fn compute(region: &RgbImage, params: &ProfileParams) -> RowProfile {
    let (width, height) = region.dimensions();
    if width == 0 || height == 0 {
        return RowProfile::default();
    }

    let threshold = params.white_threshold;
    let is_ink = |x: u32, y: u32| luma(region.get_pixel(x, y)) < threshold;

    // Horizontal ink bounding box
    let left = (0..width).find(|&x| (0..height).any(|y| is_ink(x, y)));
    let (x0, x1) = match left {
        Some(l) => {
            let r = (l..width)
                .rev()
                .find(|&x| (0..height).any(|y| is_ink(x, y)))
                .unwrap_or(l);
            (l, r + 1)
        }
        None => {
            return RowProfile {
                blank: vec![true; height as usize],
                heavy: vec![false; height as usize],
                density: vec![0.0; height as usize],
            };
        }
    };

    let step = params.downsample.max(1);
    let sampled: Vec<u32> = (x0..x1).step_by(step as usize).collect();
    let sampled_width = sampled.len().max(1) as f32;
    let blank_limit = params.max_ink_fraction * sampled_width;
    let heavy_limit = (sampled_width * (1.0 - params.max_ink_fraction)).max(0.9 * sampled_width);

    let stats: Vec<(bool, bool, f32)> = (0..height)
        .into_par_iter()
        .map(|y| {
            let ink = sampled.iter().filter(|&&x| is_ink(x, y)).count() as f32;
            (ink <= blank_limit, ink >= heavy_limit, ink / sampled_width)
        })
        .collect();

    let mut profile = RowProfile {
        blank: Vec::with_capacity(height as usize),
        heavy: Vec::with_capacity(height as usize),
        density: Vec::with_capacity(height as usize),
    };
    for (blank, heavy, density) in stats {
        profile.blank.push(blank);
        profile.heavy.push(heavy);
        profile.density.push(density);
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn region(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn paint_row(img: &mut RgbImage, y: u32, x0: u32, x1: u32) {
        for x in x0..x1 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }

    fn params() -> ProfileParams {
        ProfileParams {
            downsample: 1,
            ..Default::default()
        }
    }

    #[test]
    fn blank_region_is_all_blank() {
        let profile = compute(&region(100, 20), &params());
        assert_eq!(profile.len(), 20);
        assert!(profile.blank.iter().all(|&b| b));
        assert!(profile.heavy.iter().all(|&h| !h));
        assert_eq!(profile.last_ink_row(), None);
    }

    #[test]
    fn full_row_is_heavy() {
        let mut img = region(100, 10);
        paint_row(&mut img, 4, 0, 100);
        let profile = compute(&img, &params());
        assert!(profile.heavy[4]);
        assert!(!profile.blank[4]);
        assert_eq!(profile.density[4], 1.0);
        assert_eq!(profile.last_ink_row(), Some(4));
    }

    #[test]
    fn sparse_row_is_neither_blank_nor_heavy() {
        let mut img = region(100, 10);
        // Widen the bbox so row 4's ink stays a small fraction
        paint_row(&mut img, 0, 0, 100);
        paint_row(&mut img, 4, 0, 30);
        let profile = compute(&img, &params());
        assert!(!profile.blank[4]);
        assert!(!profile.heavy[4]);
        assert!((profile.density[4] - 0.3).abs() < 0.01);
    }

    #[test]
    fn bbox_crop_makes_narrow_ink_heavy() {
        let mut img = region(200, 10);
        // Ink confined to a 20px column band: full rows of that band are
        // heavy relative to the cropped width, not the full region width.
        paint_row(&mut img, 2, 90, 110);
        paint_row(&mut img, 3, 90, 110);
        let profile = compute(&img, &params());
        assert!(profile.heavy[2]);
        assert!(profile.heavy[3]);
        assert!(profile.blank[0]);
    }

    #[test]
    fn downsampling_keeps_classification() {
        let mut img = region(400, 12);
        paint_row(&mut img, 6, 0, 400);
        let profile = compute(&img, &ProfileParams::default());
        assert!(profile.heavy[6]);
        assert!(profile.blank[0]);
        assert_eq!(profile.len(), 12);
    }
}
