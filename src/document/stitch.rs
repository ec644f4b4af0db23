//! Stitches internal layout pages into one continuous bitmap.
//!
//! Each page is trimmed to its ink extent, the trimmed bands are stacked
//! vertically, and page-local table edges and explicit break markers are
//! remapped into offsets in the stitched image. All-white pages vanish.

use image::{Rgb, RgbImage};

use super::{Boundary, LayoutPages, RenderedDocument};

const WHITE_THRESHOLD: u8 = 250;

fn row_has_ink(page: &RgbImage, y: u32) -> bool {
    (0..page.width()).any(|x| page.get_pixel(x, y).0.iter().any(|&c| c < WHITE_THRESHOLD))
}

/// Vertical ink extent of a page as `(top, height)`, `None` when all white.
fn content_span(page: &RgbImage) -> Option<(u32, u32)> {
    let top = (0..page.height()).find(|&y| row_has_ink(page, y))?;
    let bottom = (top..page.height())
        .rev()
        .find(|&y| row_has_ink(page, y))
        .unwrap_or(top);
    Some((top, bottom - top + 1))
}

pub fn stitch(layout: LayoutPages, width: u32) -> RenderedDocument {
    let LayoutPages {
        pages,
        boundaries,
        breaks_after,
    } = layout;

    let spans: Vec<(u32, u32)> = pages
        .iter()
        .map(|p| content_span(p).unwrap_or((0, 0)))
        .collect();
    let total = spans.iter().map(|&(_, h)| h).sum::<u32>().max(1);

    let mut bitmap = RgbImage::from_pixel(width, total, Rgb([255, 255, 255]));
    let mut starts = Vec::with_capacity(pages.len());
    let mut cursor = 0u32;
    for (page, &(top, h)) in pages.iter().zip(&spans) {
        starts.push(cursor);
        let w = width.min(page.width());
        for y in 0..h {
            for x in 0..w {
                bitmap.put_pixel(x, cursor + y, *page.get_pixel(x, top + y));
            }
        }
        cursor += h;
    }

    let mut mapped: Vec<Boundary> = boundaries
        .iter()
        .map(|b| {
            let (top, h) = spans[b.page];
            Boundary {
                offset: starts[b.page] + b.y.saturating_sub(top).min(h),
                kind: b.kind,
            }
        })
        .collect();
    mapped.sort_by_key(|b| b.offset);
    mapped.dedup();

    // A break marker cuts where its page's trimmed content ends; markers at
    // the very start or end of the document have nothing to separate.
    let mut forced: Vec<u32> = breaks_after
        .iter()
        .map(|&idx| starts[idx] + spans[idx].1)
        .filter(|&off| off > 0 && off < total)
        .collect();
    forced.dedup();

    RenderedDocument {
        bitmap,
        forced_breaks: forced,
        boundaries: mapped,
    }
}
