//! # Rotulo - Markdown Label Pagination Engine
//!
//! Rotulo turns markdown into a sequence of fixed-size page bitmaps sized to
//! physical label stock. It provides:
//!
//! - **Document rendering**: a restricted markdown dialect laid out into one
//!   continuous bitmap with table-boundary and forced-break metadata
//! - **Smart slicing**: row-statistics driven cut-point selection that never
//!   bisects a line of text or a table row
//! - **Decoration**: border bars, captions and page numbers composited onto
//!   each page without clipping content
//! - **Font handling**: TTF faces with a built-in bitmap fallback
//!
//! ## Quick Start
//!
//! ```
//! use rotulo::{render_label, LabelRequest};
//!
//! let request = LabelRequest {
//!     markdown: "# Shelf A3\n\nKeep refrigerated".to_string(),
//!     width_px: 576,
//!     dpi: 300,
//!     slice_mm: 25.4,
//!     ..Default::default()
//! };
//!
//! let pages = render_label(&request)?;
//! for page in &pages {
//!     assert_eq!(page.width(), 576);
//! }
//! # Ok::<(), rotulo::RotuloError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Markdown parsing, layout and stitching |
//! | [`slicer`] | Row statistics, cut selection and page slicing |
//! | [`compose`] | Border and page-number compositing |
//! | [`font`] | Font registry, face resolution and rasterization |
//! | [`label`] | Request-level orchestration |
//! | [`geometry`] | mm/pt to pixel conversions |
//! | [`error`] | Error types |

pub mod compose;
pub mod document;
pub mod error;
pub mod font;
pub mod geometry;
pub mod label;
pub mod slicer;

// Re-exports for convenience
pub use error::RotuloError;
pub use label::{render_label, LabelRequest};
