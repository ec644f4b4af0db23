//! # Pagination Tests
//!
//! Cross-module scenarios for the render → slice → decorate pipeline:
//!
//! - **Slicing invariants**: coverage without gaps or overlap, minimum
//!   payload, blank-bitmap idempotence, fixed-stride behavior.
//! - **Table handling**: cuts land on recorded boundaries, never between
//!   the rows of a table that spans pages.
//! - **End-to-end**: full `render_label` runs with forced breaks, borders
//!   and footer page numbers.

use std::collections::HashMap;

use image::{Rgb, RgbImage};
use rotulo::compose::{BorderConfig, SideBorder};
use rotulo::document::{self, Boundary, BoundaryKind, RenderOptions, RenderedDocument};
use rotulo::font::{FaceSet, FontRegistry};
use rotulo::geometry::mm_to_px;
use rotulo::slicer::{self, SliceOptions, BORDER_OVERLAP_PX};
use rotulo::{render_label, LabelRequest};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn blank_doc(width: u32, height: u32) -> RenderedDocument {
    RenderedDocument {
        bitmap: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        forced_breaks: vec![],
        boundaries: vec![],
    }
}

fn paint_rows(doc: &mut RenderedDocument, rows: std::ops::Range<u32>) {
    for y in rows {
        for x in 0..doc.width() {
            doc.bitmap.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
}

/// 25.4 mm at 300 dpi gives a page of exactly 300 px.
fn opts_300px(smart: bool) -> SliceOptions {
    SliceOptions {
        slice_mm: 25.4,
        footer_mm: 0.0,
        dpi: 300,
        smart,
        ..Default::default()
    }
}

/// Cumulative cut offsets implied by a slice sequence.
fn cut_offsets(slices: &[slicer::PageSlice]) -> Vec<u32> {
    let mut offsets = Vec::new();
    let mut y = 0;
    for slice in slices {
        y += slice.content_height - slice.border_overlap;
        offsets.push(y);
    }
    offsets
}

// ============================================================================
// SLICING INVARIANTS
// ============================================================================

#[test]
fn blank_bitmap_slices_into_fixed_strides() {
    let doc = blank_doc(120, 1000);
    let slices = slicer::slice_pages(&doc, &opts_300px(false));
    let heights: Vec<u32> = slices.iter().map(|s| s.content_height).collect();
    assert_eq!(heights, vec![300, 300, 300, 100]);
}

#[test]
fn blank_bitmap_within_capacity_is_one_slice() {
    let doc = blank_doc(120, 180);
    let slices = slicer::slice_pages(&doc, &opts_300px(false));
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].content_height, 180);
}

#[test]
fn coverage_union_has_no_gaps_or_overlap() {
    let mut doc = blank_doc(120, 950);
    paint_rows(&mut doc, 0..950);
    let slices = slicer::slice_pages(&doc, &opts_300px(true));
    let offsets = cut_offsets(&slices);
    assert_eq!(*offsets.last().unwrap(), 950);
    for pair in offsets.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn trailing_whitespace_never_becomes_a_page() {
    let mut doc = blank_doc(120, 2000);
    paint_rows(&mut doc, 0..250);
    let slices = slicer::slice_pages(&doc, &opts_300px(true));
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].content_height, 250);
}

#[test]
fn intermediate_slices_carry_minimum_payload() {
    let mut doc = blank_doc(120, 1100);
    paint_rows(&mut doc, 0..1100);
    let slices = slicer::slice_pages(&doc, &opts_300px(true));
    for slice in &slices[..slices.len() - 1] {
        let payload = slice.content_height - slice.border_overlap;
        assert!(payload >= 75, "payload {} below minimum", payload);
    }
}

#[test]
fn slicing_is_deterministic() {
    let mut doc = blank_doc(120, 1400);
    paint_rows(&mut doc, 0..40);
    paint_rows(&mut doc, 120..700);
    paint_rows(&mut doc, 780..1300);
    let first = cut_offsets(&slicer::slice_pages(&doc, &opts_300px(true)));
    let second = cut_offsets(&slicer::slice_pages(&doc, &opts_300px(true)));
    assert_eq!(first, second);
}

// ============================================================================
// TABLE HANDLING
// ============================================================================

fn table_doc() -> RenderedDocument {
    let mut doc = blank_doc(120, 700);
    paint_rows(&mut doc, 0..620);
    doc.boundaries = vec![
        Boundary {
            offset: 50,
            kind: BoundaryKind::TableStart,
        },
        Boundary {
            offset: 150,
            kind: BoundaryKind::Row,
        },
        Boundary {
            offset: 250,
            kind: BoundaryKind::Row,
        },
        Boundary {
            offset: 350,
            kind: BoundaryKind::Row,
        },
        Boundary {
            offset: 450,
            kind: BoundaryKind::Row,
        },
        Boundary {
            offset: 550,
            kind: BoundaryKind::TableEnd,
        },
    ];
    doc
}

#[test]
fn cuts_land_on_table_boundaries() {
    let doc = table_doc();
    let slices = slicer::slice_pages(&doc, &opts_300px(true));
    let boundary_offsets: Vec<u32> = doc.boundaries.iter().map(|b| b.offset).collect();
    let offsets = cut_offsets(&slices);
    for &cut in &offsets[..offsets.len() - 1] {
        assert!(
            boundary_offsets.contains(&cut),
            "cut at {} is not a table boundary",
            cut
        );
    }
}

#[test]
fn interior_rule_cut_flags_adjacent_slices() {
    let doc = table_doc();
    let slices = slicer::slice_pages(&doc, &opts_300px(true));
    let first = &slices[0];
    assert!(first.bottom_boundary);
    assert_eq!(first.border_overlap, BORDER_OVERLAP_PX);
    assert!(slices[1].top_boundary);
    assert!(!slices[0].top_boundary);
}

#[test]
fn rendered_table_records_ordered_boundaries() {
    let md = "| item | qty |\n|---|---|\n| bolts | 40 |\n| nuts | 12 |";
    let doc = document::render(md, &FaceSet::builtin(), &RenderOptions::default());
    let kinds: Vec<BoundaryKind> = doc.boundaries.iter().map(|b| b.kind).collect();
    assert_eq!(kinds.first(), Some(&BoundaryKind::TableStart));
    assert_eq!(kinds.last(), Some(&BoundaryKind::TableEnd));
    for pair in doc.boundaries.windows(2) {
        assert!(pair[0].offset < pair[1].offset);
    }
}

#[test]
fn document_ending_in_table_keeps_its_bottom_rule() {
    let md = "| a | b |\n|---|---|\n| 1 | 2 |";
    let doc = document::render(md, &FaceSet::builtin(), &RenderOptions::default());
    // The trimmed document ends on the table's closing rule
    assert_eq!(doc.boundaries.last().map(|b| b.offset), Some(doc.height()));

    let slices = slicer::slice_pages(&doc, &opts_300px(true));
    let covered: u32 = slices
        .iter()
        .map(|s| s.content_height - s.border_overlap)
        .sum();
    assert_eq!(covered, doc.height());

    let last = slices.last().unwrap();
    let y = last.content_height - 1;
    let rule_ink = (0..last.image.width())
        .filter(|&x| last.image.get_pixel(x, y).0[0] < 250)
        .count();
    assert_eq!(rule_ink as u32, last.image.width());
}

// ============================================================================
// FORCED BREAKS
// ============================================================================

#[test]
fn forced_break_splits_fragments_at_marker() {
    let md = "alpha\n\n---PAGE---\n\nbeta";
    let opts = RenderOptions {
        allow_pagebreaks: true,
        ..Default::default()
    };
    let doc = document::render(md, &FaceSet::builtin(), &opts);
    assert_eq!(doc.forced_breaks.len(), 1);
    let break_at = doc.forced_breaks[0];
    assert!(break_at > 0 && break_at < doc.height());

    let slices = slicer::slice_pages(
        &doc,
        &SliceOptions {
            slice_mm: 0.0,
            ..Default::default()
        },
    );
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].content_height, break_at);
    assert_eq!(slices[1].content_height, doc.height() - break_at);
}

#[test]
fn marker_is_plain_text_without_pagebreaks() {
    let md = "alpha\n\n---PAGE---\n\nbeta";
    let doc = document::render(md, &FaceSet::builtin(), &RenderOptions::default());
    assert!(doc.forced_breaks.is_empty());
}

// ============================================================================
// FONT FALLBACK
// ============================================================================

#[test]
fn missing_style_map_falls_back_to_builtin() {
    let mut registry = FontRegistry::new();
    let faces = registry.resolve_faces(&HashMap::new(), "Bold").unwrap();
    assert!(faces.regular.is_builtin());
    assert!(faces.bold.is_builtin());
    assert!(faces.mono.is_builtin());
}

// ============================================================================
// END TO END
// ============================================================================

#[test]
fn full_pipeline_with_borders_and_page_numbers() {
    let req = LabelRequest {
        markdown: "# Inventory\n\n| item | qty |\n|---|---|\n| bolts | 40 |\n| nuts | 12 |\n\n\
                   Some *styled* text with **emphasis** and `code`.\n\n\
                   > a quoted remark\n\n\
                   - first\n- second\n- third"
            .to_string(),
        slice_mm: 30.0,
        footer_mm: 4.0,
        border: BorderConfig {
            left: SideBorder {
                enabled: true,
                area_mm: 5.0,
                bar: true,
                bar_mm: 3.0,
                ..Default::default()
            },
            page_numbers: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let pages = render_label(&req).unwrap();
    assert!(!pages.is_empty());

    let page_h = mm_to_px(30.0, 300);
    let left_area = mm_to_px(5.0, 300);
    for page in &pages {
        assert_eq!(page.height(), page_h);
        assert_eq!(page.width(), 576 + left_area);
        // Left bar ink spans the full height
        for y in 0..page.height() {
            assert_eq!(page.get_pixel(0, y).0, [0, 0, 0]);
        }
    }
}

#[test]
fn bottom_bar_scenario_grows_canvas_and_fills_red() {
    let req = LabelRequest {
        markdown: "content".to_string(),
        border: BorderConfig {
            bottom: SideBorder {
                enabled: true,
                area_mm: 6.0,
                bar: true,
                bar_mm: 4.0,
                bar_color: rotulo::compose::BarColor::Red,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };
    let pages = render_label(&req).unwrap();
    assert_eq!(pages.len(), 1);
    let page = &pages[0];
    let area = mm_to_px(6.0, 300);
    let bar = mm_to_px(4.0, 300);
    let content_h = page.height() - area;
    for y in content_h..content_h + bar {
        assert_eq!(page.get_pixel(page.width() / 2, y).0, [255, 0, 0]);
    }
}

#[test]
fn pipeline_output_is_deterministic() {
    let req = LabelRequest {
        markdown: "# Repeat\n\nsame input, same pixels\n\n| a | b |\n|---|---|\n| 1 | 2 |"
            .to_string(),
        slice_mm: 25.4,
        ..Default::default()
    };
    let first = render_label(&req).unwrap();
    let second = render_label(&req).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
