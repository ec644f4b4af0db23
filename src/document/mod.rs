//! # Document Renderer
//!
//! Turns markdown text into one continuous bitmap plus the metadata the
//! slicer needs: forced-break offsets from explicit page-break markers and
//! table-boundary offsets derived from table geometry at render time.
//!
//! The pipeline is parse → layout → stitch. Layout happens on internal
//! fixed-height pages behind the narrow [`LayoutEngine`] adapter so the
//! engine is swappable; [`stitch`] trims each page, concatenates them, and
//! remaps every page-local coordinate into the continuous output space.

pub mod engine;
pub mod markdown;
pub mod stitch;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::font::FaceSet;

/// Kind of a recorded table edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    TableStart,
    Row,
    TableEnd,
}

/// One table edge in the continuous output space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub offset: u32,
    pub kind: BoundaryKind,
}

/// A table edge in internal page coordinates, before stitching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBoundary {
    pub page: usize,
    pub y: u32,
    pub kind: BoundaryKind,
}

/// Rendering parameters consumed from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Content width in pixels (label printable width).
    pub width_px: u32,
    /// Device pixel density; drives every mm/pt conversion.
    pub dpi: u32,
    /// Base font size in points.
    pub base_font_pt: f32,
    /// Line spacing percentage (100 = single).
    pub line_spacing: u32,
    /// Honor explicit page-break markers.
    pub allow_pagebreaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            width_px: 576,
            dpi: 300,
            base_font_pt: 12.0,
            line_spacing: 100,
            allow_pagebreaks: false,
        }
    }
}

/// Output of the layout engine: internal pages plus page-local metadata.
#[derive(Debug, Default)]
pub struct LayoutPages {
    pub pages: Vec<RgbImage>,
    pub boundaries: Vec<PageBoundary>,
    /// Indices of pages that were terminated by an explicit break marker.
    pub breaks_after: Vec<usize>,
}

/// Narrow adapter between block layout and the page-to-continuum stitcher.
/// Implementations lay blocks out on internal fixed-height pages and report
/// table edges and explicit breaks in page-local coordinates.
pub trait LayoutEngine {
    fn layout(&self, blocks: &[markdown::Block], faces: &FaceSet, opts: &RenderOptions) -> LayoutPages;
}

/// The continuous rendered document handed to the slicer.
#[derive(Debug)]
pub struct RenderedDocument {
    pub bitmap: RgbImage,
    /// Ascending, strictly inside `(0, height)`.
    pub forced_breaks: Vec<u32>,
    /// Ascending by offset; a trailing `TableEnd` may sit at exactly `height`.
    pub boundaries: Vec<Boundary>,
}

impl RenderedDocument {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Render markdown into a continuous bitmap using the built-in engine.
pub fn render(markdown_text: &str, faces: &FaceSet, opts: &RenderOptions) -> RenderedDocument {
    let blocks = markdown::parse(markdown_text);
    let engine = engine::FlowEngine;
    let pages = engine.layout(&blocks, faces, opts);
    stitch::stitch(pages, opts.width_px.max(10))
}
