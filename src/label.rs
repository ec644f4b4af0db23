//! Request-level orchestration.
//!
//! Ties the pipeline together for one label job: resolve the requested font
//! faces, render the markdown into a continuous bitmap, slice it into pages,
//! stamp footer page numbers, and decorate each page with the configured
//! borders. The result is the ordered page sequence handed to the printing
//! collaborator.

use std::collections::HashMap;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::compose::{self, BorderConfig};
use crate::document::{self, RenderOptions};
use crate::error::RotuloError;
use crate::font::FontRegistry;
use crate::slicer::{self, SliceOptions};

/// Everything one render job consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelRequest {
    pub markdown: String,
    /// Style name to font file path, e.g. `"Bold" -> "/fonts/DejaVu-Bold.ttf"`.
    pub fonts: HashMap<String, String>,
    pub preferred_style: String,
    /// Printable label width in pixels.
    pub width_px: u32,
    pub dpi: u32,
    pub base_font_pt: f32,
    /// Line spacing percentage, 100 = single.
    pub line_spacing: u32,
    pub allow_pagebreaks: bool,
    /// Physical page height in mm; 0 renders one unpaginated page.
    pub slice_mm: f32,
    /// Footer strip reserved for page numbers on sliced pages, in mm.
    pub footer_mm: f32,
    pub border: BorderConfig,
    /// Render `2/5` instead of `2` in footer page numbers.
    pub page_number_total: bool,
}

impl Default for LabelRequest {
    fn default() -> Self {
        LabelRequest {
            markdown: String::new(),
            fonts: HashMap::new(),
            preferred_style: "Regular".to_string(),
            width_px: 576,
            dpi: 300,
            base_font_pt: 12.0,
            line_spacing: 100,
            allow_pagebreaks: false,
            slice_mm: 0.0,
            footer_mm: 0.0,
            border: BorderConfig::default(),
            page_number_total: true,
        }
    }
}

/// Run the full pipeline for one request.
///
/// Font resolution failures propagate; decoration failures degrade to
/// undecorated elements on an otherwise complete page sequence.
pub fn render_label(req: &LabelRequest) -> Result<Vec<RgbImage>, RotuloError> {
    let mut registry = FontRegistry::new();
    let faces = registry.resolve_faces(&req.fonts, &req.preferred_style)?;

    let render_opts = RenderOptions {
        width_px: req.width_px,
        dpi: req.dpi,
        base_font_pt: req.base_font_pt,
        line_spacing: req.line_spacing,
        allow_pagebreaks: req.allow_pagebreaks,
    };
    let doc = document::render(&req.markdown, &faces, &render_opts);

    let slice_opts = SliceOptions {
        slice_mm: req.slice_mm,
        footer_mm: req.footer_mm,
        dpi: req.dpi,
        ..Default::default()
    };
    let mut pages = slicer::paginate(&doc, &slice_opts);
    let total = pages.len();
    log::debug!(
        "rendered {}x{} document into {} page(s)",
        doc.width(),
        doc.height(),
        total
    );

    if req.slice_mm > 0.0 && req.footer_mm > 0.0 && req.border.page_numbers {
        for (i, page) in pages.iter_mut().enumerate() {
            compose::draw_page_number_footer(
                page,
                i + 1,
                total,
                req.footer_mm,
                req.border.page_number_mm,
                req.dpi,
                req.border.page_number_circle,
                req.page_number_total,
                &faces.regular,
            );
        }
    }

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| compose::decorate(&page, &req.border, &faces.regular, i + 1, total, req.dpi))
        .collect())
}
