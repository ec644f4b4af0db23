//! Page slicing.
//!
//! Cuts the continuous rendered bitmap into fixed-height pages. The document
//! is first split at forced breaks; each fragment is then cut repeatedly by
//! the selector in `cut`, guided by the row statistics from `profile` and by
//! recorded table boundaries. Cuts landing on an interior table row carry the
//! ruled line into the slice above via a small crop overlap, and the next
//! slice is flagged so the compositor can suppress a duplicate stroke.

pub mod cut;
pub mod profile;

use image::{imageops, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::document::{Boundary, BoundaryKind, RenderedDocument};
use crate::geometry::mm_to_px;

use cut::{min_meaningful_height, CutParams};
use profile::{ProfileParams, RowProfile};

/// Crop overlap carrying an interior table rule into the slice above it.
/// The inner grid is 0.6 pt, about 2.5 px at 300 dpi.
pub const BORDER_OVERLAP_PX: u32 = 3;

pub const DEFAULT_SLICE_WINDOW_MM: f32 = 6.0;
pub const DEFAULT_MIN_BLANK_RUN: u32 = 4;

/// Pagination parameters. `slice_mm <= 0` disables pagination entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceOptions {
    /// Physical page height in mm; 0 produces one unpaginated page.
    pub slice_mm: f32,
    /// Footer strip reserved below the content on every page, in mm.
    pub footer_mm: f32,
    pub dpi: u32,
    /// Row-statistics guided cutting; off means fixed-stride cuts.
    pub smart: bool,
    pub window_mm: f32,
    pub min_blank_run: u32,
}

impl Default for SliceOptions {
    fn default() -> Self {
        SliceOptions {
            slice_mm: 0.0,
            footer_mm: 0.0,
            dpi: 300,
            smart: true,
            window_mm: DEFAULT_SLICE_WINDOW_MM,
            min_blank_run: DEFAULT_MIN_BLANK_RUN,
        }
    }
}

/// One page-sized crop of the document, before decoration.
#[derive(Debug)]
pub struct PageSlice {
    /// Fixed-canvas page image, content pasted at the top.
    pub image: RgbImage,
    /// Previous slice ended on a table rule; suppress the duplicate stroke.
    pub top_boundary: bool,
    /// This slice ends on an interior table rule.
    pub bottom_boundary: bool,
    /// Rows of actual content, overlap included.
    pub content_height: u32,
    pub border_overlap: u32,
}

fn crop_rows(bitmap: &RgbImage, start: u32, end: u32) -> RgbImage {
    imageops::crop_imm(bitmap, 0, start, bitmap.width(), end - start).to_image()
}

/// Slice the rendered document into pages.
pub fn slice_pages(doc: &RenderedDocument, opts: &SliceOptions) -> Vec<PageSlice> {
    let height = doc.height();
    let mut slices: Vec<PageSlice> = Vec::new();
    let mut start = 0u32;
    let mut carry = false;

    let run_fragment = |slices: &mut Vec<PageSlice>, start: u32, end: u32, carry: bool| {
        let fragment = crop_rows(&doc.bitmap, start, end);
        slice_fragment(&fragment, &doc.boundaries, start, carry, opts, slices)
    };

    for &raw in &doc.forced_breaks {
        if raw <= start || raw >= height {
            continue;
        }
        carry = run_fragment(&mut slices, start, raw, carry);
        start = raw;
    }
    if start < height || slices.is_empty() {
        run_fragment(&mut slices, start, height, carry);
    }
    slices
}

/// Slice one fragment, appending to `out`; returns the carried boundary flag.
fn slice_fragment(
    fragment: &RgbImage,
    boundaries: &[Boundary],
    start_offset: u32,
    mut carry: bool,
    opts: &SliceOptions,
    out: &mut Vec<PageSlice>,
) -> bool {
    let height = fragment.height();
    if height == 0 {
        return carry;
    }

    let footer_px = mm_to_px(opts.footer_mm, opts.dpi);

    if opts.slice_mm <= 0.0 {
        let mut page =
            RgbImage::from_pixel(fragment.width(), height + footer_px, Rgb([255, 255, 255]));
        imageops::replace(&mut page, fragment, 0, 0);
        out.push(PageSlice {
            image: page,
            top_boundary: carry,
            bottom_boundary: false,
            content_height: height,
            border_overlap: 0,
        });
        return false;
    }

    let page_px = mm_to_px(opts.slice_mm, opts.dpi).max(1);
    let capacity = page_px.saturating_sub(footer_px).max(1);
    let window = mm_to_px(opts.window_mm, opts.dpi).min(capacity.saturating_sub(1).max(1));
    let min_run = opts.min_blank_run.max(1);

    let profile: Option<RowProfile> = opts
        .smart
        .then(|| profile::compute(fragment, &ProfileParams::default()));
    let total = match &profile {
        Some(p) => p.last_ink_row().map_or(0, |y| y + 1),
        None => height,
    };

    let local: Vec<Boundary> = boundaries
        .iter()
        .filter(|b| b.offset > start_offset && b.offset <= start_offset + height)
        .map(|b| Boundary {
            offset: b.offset - start_offset,
            kind: b.kind,
        })
        .collect();

    let params = CutParams {
        capacity,
        window,
        min_blank_run: min_run,
    };
    let min_meaningful = min_meaningful_height(min_run);

    let mut y = 0u32;
    let mut emitted = false;
    loop {
        if y >= total {
            if !emitted && total == 0 {
                out.push(PageSlice {
                    image: RgbImage::from_pixel(fragment.width(), page_px, Rgb([255, 255, 255])),
                    top_boundary: carry,
                    bottom_boundary: false,
                    content_height: 0,
                    border_overlap: 0,
                });
                carry = false;
            }
            break;
        }

        let cut = cut::select_cut(profile.as_ref(), &local, y, total, &params);
        let slice_h = cut.y.saturating_sub(y);

        // Tiny trailing slices are whitespace noise
        if slice_h < min_meaningful && cut.y >= total {
            break;
        }

        let (bottom_boundary, overlap) = match cut.boundary {
            Some(BoundaryKind::Row) if cut.y < total => (true, BORDER_OVERLAP_PX),
            _ => (false, 0),
        };

        let crop_end = (cut.y + overlap).min(height);
        let mut page =
            RgbImage::from_pixel(fragment.width(), page_px, Rgb([255, 255, 255]));
        let band = crop_rows(fragment, y, crop_end);
        imageops::replace(&mut page, &band, 0, 0);

        let content_height = slice_h + overlap;
        log::debug!(
            "slice y={} cut_y={} boundary={:?} content_height={} overlap={}",
            y,
            cut.y,
            cut.boundary,
            content_height,
            overlap
        );
        out.push(PageSlice {
            image: page,
            top_boundary: carry,
            bottom_boundary,
            content_height,
            border_overlap: overlap,
        });

        emitted = true;
        carry = bottom_boundary;
        y = cut.y;
    }
    carry
}

/// Slice and finalize: erase the vertical grid stubs that the crop overlap
/// drags in below an interior-rule cut, then hand back the bare page images.
pub fn paginate(doc: &RenderedDocument, opts: &SliceOptions) -> Vec<RgbImage> {
    slice_pages(doc, opts)
        .into_iter()
        .map(|slice| {
            let mut page = slice.image;
            if slice.bottom_boundary && slice.content_height > 0 && slice.border_overlap > 0 {
                let erase_start = slice.content_height.saturating_sub(1).min(page.height());
                for py in erase_start..page.height() {
                    for px in 0..page.width() {
                        page.put_pixel(px, py, Rgb([255, 255, 255]));
                    }
                }
            }
            page
        })
        .collect()
}

// ============================================================
// Tests
// ============================================================
