//! Built-in page-based layout engine.
//!
//! Lays dialect blocks out on internal pages of a fixed nominal height,
//! wrapping text with measured glyph advances. Table edges are recorded in
//! page-local coordinates as rows are drawn; the stitcher remaps them into
//! the continuous output space. Explicit page-break markers terminate the
//! current internal page and are reported through `breaks_after`.

use image::{Rgb, RgbImage};

use crate::font::raster;
use crate::font::{Face, FaceSet};
use crate::geometry::{mm_to_px, pt_to_px, pt_to_px_f};

use super::markdown::{Block, CellAlign, Span, SpanStyle};
use super::{BoundaryKind, LayoutEngine, LayoutPages, PageBoundary, RenderOptions};

/// Nominal internal page height. Tall enough that natural overflow is rare;
/// pages exist mainly to give explicit break markers a place to cut.
pub const DEFAULT_PAGE_HEIGHT_MM: f32 = 400.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const WHITESMOKE: Rgb<u8> = Rgb([245, 245, 245]);

/// The built-in [`LayoutEngine`].
pub struct FlowEngine;

impl LayoutEngine for FlowEngine {
    fn layout(&self, blocks: &[Block], faces: &FaceSet, opts: &RenderOptions) -> LayoutPages {
        let width = opts.width_px.max(10);
        let page_h = mm_to_px(DEFAULT_PAGE_HEIGHT_MM, opts.dpi).max(1);
        let styles = Styles::new(opts);
        let mut ctx = PageCtx::new(width, page_h, faces);

        for block in blocks {
            match block {
                Block::Heading { level, spans } => {
                    let style = styles.heading(*level);
                    ctx.draw_paragraph(spans, &style, width);
                }
                Block::Paragraph { spans } => {
                    ctx.draw_paragraph(spans, &styles.para, width);
                }
                Block::List { start, items } => {
                    for (idx, item) in items.iter().enumerate() {
                        let prefix = match start {
                            Some(n) => format!("{}. ", n + idx as u64),
                            None => "\u{2022} ".to_string(),
                        };
                        let mut spans = Vec::with_capacity(item.len() + 1);
                        spans.push(Span::plain(prefix));
                        spans.extend(item.iter().cloned());
                        ctx.draw_paragraph(&spans, &styles.para, width);
                    }
                }
                Block::Quote { lines } => ctx.draw_quote(lines, &styles, opts.dpi),
                Block::CodeBlock { text } => ctx.draw_code_block(text, &styles, opts.dpi),
                Block::Table {
                    aligns,
                    header,
                    rows,
                } => ctx.draw_table(aligns, header, rows, &styles, opts.dpi),
                Block::PageBreak => {
                    if opts.allow_pagebreaks {
                        ctx.forced_break();
                    }
                    continue;
                }
            }
            ctx.advance(styles.block_gap);
        }

        ctx.finish()
    }
}

/// Resolved per-block typography, derived from the request options.
#[derive(Debug, Clone, Copy)]
struct BlockStyle {
    px: f32,
    /// Leading in pixels.
    line_h: u32,
    space_after: u32,
    bold: bool,
    italic: bool,
    color: Rgb<u8>,
}

#[derive(Debug, Clone, Copy)]
struct Styles {
    para: BlockStyle,
    h1: BlockStyle,
    h2: BlockStyle,
    h3: BlockStyle,
    quote: BlockStyle,
    code: BlockStyle,
    block_gap: u32,
}

impl Styles {
    fn new(opts: &RenderOptions) -> Self {
        let dpi = opts.dpi;
        let base = opts.base_font_pt.max(1.0);
        let factor = (opts.line_spacing.max(1) as f32) / 100.0;
        let lead_pt = (base * factor).max(base);

        let px = |pt: f32| pt_to_px_f(pt, dpi);
        let lead = |pt: f32| pt_to_px(pt, dpi).max(1);

        let para = BlockStyle {
            px: px(base),
            line_h: lead(lead_pt),
            space_after: pt_to_px((base * 0.15).max(2.0), dpi),
            bold: false,
            italic: false,
            color: BLACK,
        };
        Styles {
            para,
            h1: BlockStyle {
                px: px((base * 1.6).floor()),
                line_h: lead((lead_pt * 1.4).floor()),
                space_after: pt_to_px(lead_pt, dpi),
                bold: true,
                italic: false,
                color: BLACK,
            },
            h2: BlockStyle {
                px: px((base * 1.3).floor()),
                line_h: lead((lead_pt * 1.2).floor()),
                space_after: pt_to_px(lead_pt * 0.9, dpi),
                bold: true,
                italic: false,
                color: BLACK,
            },
            h3: BlockStyle {
                px: px((base * 1.1).floor()),
                line_h: lead((lead_pt * 1.1).floor()),
                space_after: pt_to_px(lead_pt * 0.8, dpi),
                bold: true,
                italic: true,
                color: BLACK,
            },
            quote: BlockStyle {
                color: GRAY,
                ..para
            },
            code: BlockStyle {
                line_h: lead((lead_pt * 0.95).floor()),
                ..para
            },
            block_gap: pt_to_px(base * 0.3, dpi),
        }
    }

    fn heading(&self, level: u8) -> BlockStyle {
        match level {
            1 => self.h1,
            2 => self.h2,
            _ => self.h3,
        }
    }
}

/// One wrapped word with its resolved style and measured width.
#[derive(Debug, Clone)]
struct Word {
    text: String,
    style: SpanStyle,
    width: u32,
}

type Line = Vec<Word>;

fn face_for<'a>(faces: &'a FaceSet, style: SpanStyle) -> &'a Face {
    if style.code {
        &faces.mono
    } else if style.bold && style.italic {
        &faces.bold_italic
    } else if style.bold {
        &faces.bold
    } else if style.italic {
        &faces.italic
    } else {
        &faces.regular
    }
}

/// Effective span style under a block style (headings force bold/italic).
fn effective_style(span: SpanStyle, block: &BlockStyle) -> SpanStyle {
    SpanStyle {
        bold: span.bold || block.bold,
        italic: span.italic || block.italic,
        code: span.code,
    }
}

fn space_width(faces: &FaceSet, style: SpanStyle, px: f32) -> u32 {
    raster::measure(face_for(faces, style), " ", px).0
}

/// Greedy word wrap of styled spans into lines no wider than `max_w`.
/// `\n` inside a span forces a line break.
fn wrap_spans(spans: &[Span], block: &BlockStyle, faces: &FaceSet, max_w: u32) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut current: Line = Vec::new();
    let mut current_w: u32 = 0;

    fn flush(lines: &mut Vec<Line>, current: &mut Line, current_w: &mut u32) {
        if !current.is_empty() {
            lines.push(std::mem::take(current));
        }
        *current_w = 0;
    }

    for span in spans {
        let style = effective_style(span.style, block);
        let face = face_for(faces, style);
        for (seg_idx, segment) in span.text.split('\n').enumerate() {
            if seg_idx > 0 {
                flush(&mut lines, &mut current, &mut current_w);
            }
            for token in segment.split_whitespace() {
                let mut word = token.to_string();
                let mut w = raster::measure(face, &word, block.px).0;

                // Hard-split words wider than the line
                while w > max_w && word.chars().count() > 1 {
                    let mut head = String::new();
                    let mut head_w = 0;
                    for ch in word.chars() {
                        let cw = raster::measure(face, &ch.to_string(), block.px).0;
                        if head_w + cw > max_w && !head.is_empty() {
                            break;
                        }
                        head.push(ch);
                        head_w += cw;
                    }
                    flush(&mut lines, &mut current, &mut current_w);
                    lines.push(vec![Word {
                        text: head.clone(),
                        style,
                        width: head_w,
                    }]);
                    word = word.chars().skip(head.chars().count()).collect();
                    w = raster::measure(face, &word, block.px).0;
                }
                if word.is_empty() {
                    continue;
                }

                let sep = if current.is_empty() {
                    0
                } else {
                    space_width(faces, style, block.px)
                };
                if !current.is_empty() && current_w + sep + w > max_w {
                    flush(&mut lines, &mut current, &mut current_w);
                    current_w = w;
                } else {
                    current_w += sep + w;
                }
                current.push(Word {
                    text: word,
                    style,
                    width: w,
                });
            }
        }
    }
    flush(&mut lines, &mut current, &mut current_w);
    lines
}

fn line_width(line: &Line, faces: &FaceSet, px: f32) -> u32 {
    let mut w = 0;
    for (i, word) in line.iter().enumerate() {
        if i > 0 {
            w += space_width(faces, word.style, px);
        }
        w += word.width;
    }
    w
}

/// Leading for a line, never less than the tallest face on it.
fn line_height(line: &Line, block: &BlockStyle, faces: &FaceSet) -> u32 {
    let glyphs = line
        .iter()
        .map(|w| raster::line_height(face_for(faces, w.style), block.px))
        .max()
        .unwrap_or(0);
    block.line_h.max(glyphs)
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x1 = (x + w).min(img.width());
    let y1 = (y + h).min(img.height());
    for py in y.min(img.height())..y1 {
        for px in x.min(img.width())..x1 {
            img.put_pixel(px, py, color);
        }
    }
}

/// Mutable layout state: the page stack and the cursor on the current page.
struct PageCtx<'a> {
    faces: &'a FaceSet,
    width: u32,
    page_h: u32,
    pages: Vec<RgbImage>,
    boundaries: Vec<PageBoundary>,
    breaks_after: Vec<usize>,
    current: RgbImage,
    cursor: u32,
}

impl<'a> PageCtx<'a> {
    fn new(width: u32, page_h: u32, faces: &'a FaceSet) -> Self {
        PageCtx {
            faces,
            width,
            page_h,
            pages: Vec::new(),
            boundaries: Vec::new(),
            breaks_after: Vec::new(),
            current: RgbImage::from_pixel(width, page_h, WHITE),
            cursor: 0,
        }
    }

    fn new_page(&mut self) {
        let full = std::mem::replace(
            &mut self.current,
            RgbImage::from_pixel(self.width, self.page_h, WHITE),
        );
        self.pages.push(full);
        self.cursor = 0;
    }

    /// Break the page if `h` more pixels would overflow it. A block taller
    /// than a whole page draws clipped rather than looping forever.
    fn ensure(&mut self, h: u32) {
        if self.cursor > 0 && self.cursor + h > self.page_h {
            self.new_page();
        }
    }

    fn advance(&mut self, h: u32) {
        self.cursor += h;
    }

    fn forced_break(&mut self) {
        self.breaks_after.push(self.pages.len());
        self.new_page();
    }

    fn record_boundary(&mut self, kind: BoundaryKind) {
        self.boundaries.push(PageBoundary {
            page: self.pages.len(),
            y: self.cursor.min(self.page_h),
            kind,
        });
    }

    fn finish(mut self) -> LayoutPages {
        let last = std::mem::take(&mut self.current);
        self.pages.push(last);
        LayoutPages {
            pages: self.pages,
            boundaries: self.boundaries,
            breaks_after: self.breaks_after,
        }
    }

    fn draw_line_at(&mut self, line: &Line, x0: u32, y: u32, px: f32, color: Rgb<u8>) {
        let mut x = x0 as i32;
        for (i, word) in line.iter().enumerate() {
            if i > 0 {
                x += space_width(self.faces, word.style, px) as i32;
            }
            let face = face_for(self.faces, word.style);
            raster::draw(&mut self.current, face, &word.text, x, y as i32, px, color);
            x += word.width as i32;
        }
    }

    fn draw_paragraph(&mut self, spans: &[Span], style: &BlockStyle, max_w: u32) {
        let lines = wrap_spans(spans, style, self.faces, max_w);
        for line in &lines {
            let lh = line_height(line, style, self.faces);
            self.ensure(lh);
            self.draw_line_at(line, 0, self.cursor, style.px, style.color);
            self.advance(lh);
        }
        self.advance(style.space_after);
    }

    fn draw_quote(&mut self, quote_lines: &[Vec<Span>], styles: &Styles, dpi: u32) {
        let style = styles.quote;
        let rule_w = pt_to_px(3.0, dpi).max(2);
        let indent = rule_w + pt_to_px(6.0, dpi);
        let pad_y = pt_to_px(2.0, dpi);
        let max_w = self.width.saturating_sub(indent).max(1);

        let mut rule_band = |ctx: &mut Self, h: u32| {
            ctx.ensure(h);
            fill_rect(&mut ctx.current, 0, ctx.cursor, rule_w, h, GRAY);
            ctx.advance(h);
        };

        rule_band(self, pad_y);
        for para in quote_lines {
            let lines = wrap_spans(para, &style, self.faces, max_w);
            for line in &lines {
                let lh = line_height(line, &style, self.faces);
                self.ensure(lh);
                fill_rect(&mut self.current, 0, self.cursor, rule_w, lh, GRAY);
                self.draw_line_at(line, indent, self.cursor, style.px, style.color);
                self.advance(lh);
            }
        }
        rule_band(self, pad_y);
        self.advance(style.space_after);
    }

    fn draw_code_block(&mut self, text: &str, styles: &Styles, dpi: u32) {
        let style = styles.code;
        let pad_x = pt_to_px(6.0, dpi);
        let pad_y = pt_to_px(4.0, dpi);
        let mono = &self.faces.mono;
        let lh = style.line_h.max(raster::line_height(mono, style.px));

        let mut bg_band = |ctx: &mut Self, h: u32| {
            ctx.ensure(h);
            fill_rect(&mut ctx.current, 0, ctx.cursor, ctx.width, h, WHITESMOKE);
            ctx.advance(h);
        };

        bg_band(self, pad_y);
        for raw_line in text.split('\n') {
            let line = raw_line.replace('\t', "    ");
            self.ensure(lh);
            fill_rect(&mut self.current, 0, self.cursor, self.width, lh, WHITESMOKE);
            let face = &self.faces.mono;
            raster::draw(
                &mut self.current,
                face,
                &line,
                pad_x as i32,
                self.cursor as i32,
                style.px,
                BLACK,
            );
            self.advance(lh);
        }
        bg_band(self, pad_y);
        self.advance(style.space_after);
    }

    fn draw_table(
        &mut self,
        aligns: &[CellAlign],
        header: &[Vec<Span>],
        rows: &[Vec<Vec<Span>>],
        styles: &Styles,
        dpi: u32,
    ) {
        let ncols = header.len().max(1) as u32;
        let col_w = (self.width / ncols).max(1);
        let pad_x = pt_to_px(4.0, dpi);
        let pad_y = pt_to_px(2.0, dpi);
        let grid_w = pt_to_px(0.6, dpi).max(1);
        let box_w = pt_to_px(1.0, dpi).max(1);
        let cell_w = col_w.saturating_sub(2 * pad_x).max(1);

        let header_style = BlockStyle {
            bold: true,
            ..styles.para
        };
        let body_style = styles.para;

        // Wrap all cells up front so row heights are known before drawing.
        struct PreparedRow {
            cells: Vec<Vec<Line>>,
            line_h: u32,
            height: u32,
            is_header: bool,
        }
        let prepare = |cells: &[Vec<Span>], style: &BlockStyle, is_header: bool| {
            let wrapped: Vec<Vec<Line>> = cells
                .iter()
                .map(|c| wrap_spans(c, style, self.faces, cell_w))
                .collect();
            let line_h = wrapped
                .iter()
                .flatten()
                .map(|l| line_height(l, style, self.faces))
                .max()
                .unwrap_or(style.line_h);
            let max_lines = wrapped.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
            PreparedRow {
                cells: wrapped,
                line_h,
                height: max_lines * line_h + 2 * pad_y,
                is_header,
            }
        };

        let mut prepared = Vec::with_capacity(rows.len() + 1);
        prepared.push(prepare(header, &header_style, true));
        for row in rows {
            prepared.push(prepare(row, &body_style, false));
        }

        let mut prev_was_header = false;
        for (idx, row) in prepared.iter().enumerate() {
            // Table top and the header underline are heavier than the grid
            let top_w = if idx == 0 || prev_was_header {
                box_w
            } else {
                grid_w
            };
            self.ensure(top_w + row.height);
            self.record_boundary(if idx == 0 {
                BoundaryKind::TableStart
            } else {
                BoundaryKind::Row
            });

            // Top ruled line, owned by the slice above when cut here
            fill_rect(&mut self.current, 0, self.cursor, self.width, top_w, BLACK);

            let band_y = self.cursor + top_w;
            if row.is_header {
                fill_rect(&mut self.current, 0, band_y, self.width, row.height, WHITESMOKE);
            }

            // Vertical edges spanning the row band
            for j in 0..=ncols {
                let (x, w) = if j == ncols {
                    (self.width.saturating_sub(box_w), box_w)
                } else if j == 0 {
                    (0, box_w)
                } else {
                    (j * col_w, grid_w)
                };
                fill_rect(&mut self.current, x, self.cursor, w, top_w + row.height, BLACK);
            }

            let style = if row.is_header { header_style } else { body_style };
            for (col, cell_lines) in row.cells.iter().enumerate() {
                let col_x = col as u32 * col_w;
                let align = aligns.get(col).copied().unwrap_or_default();
                let mut ty = band_y + pad_y;
                for line in cell_lines {
                    let lw = line_width(line, self.faces, style.px).min(cell_w);
                    let tx = match align {
                        CellAlign::Left => col_x + pad_x,
                        CellAlign::Center => col_x + pad_x + (cell_w - lw) / 2,
                        CellAlign::Right => col_x + pad_x + (cell_w - lw),
                    };
                    self.draw_line_at(line, tx, ty, style.px, style.color);
                    ty += row.line_h;
                }
            }

            self.advance(top_w + row.height);
            prev_was_header = row.is_header;
        }

        // Bottom edge closes the table. Its boundary sits below the rule so
        // a cut there keeps the closing line with the slice above it.
        fill_rect(&mut self.current, 0, self.cursor, self.width, box_w, BLACK);
        self.advance(box_w);
        self.record_boundary(BoundaryKind::TableEnd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::markdown;

    fn layout(md: &str, allow_pagebreaks: bool) -> LayoutPages {
        let opts = RenderOptions {
            allow_pagebreaks,
            ..Default::default()
        };
        let blocks = markdown::parse(md);
        FlowEngine.layout(&blocks, &FaceSet::builtin(), &opts)
    }

    fn ink_rows(img: &RgbImage) -> usize {
        (0..img.height())
            .filter(|&y| (0..img.width()).any(|x| img.get_pixel(x, y).0[0] < 250))
            .count()
    }

    #[test]
    fn empty_document_is_one_blank_page() {
        let pages = layout("", false);
        assert_eq!(pages.pages.len(), 1);
        assert_eq!(ink_rows(&pages.pages[0]), 0);
        assert!(pages.boundaries.is_empty());
        assert!(pages.breaks_after.is_empty());
    }

    #[test]
    fn paragraph_produces_ink() {
        let pages = layout("hello world", false);
        assert_eq!(pages.pages.len(), 1);
        assert!(ink_rows(&pages.pages[0]) > 0);
    }

    #[test]
    fn page_break_marker_starts_new_page() {
        let pages = layout("one\n\n---PAGE---\n\ntwo", true);
        assert_eq!(pages.pages.len(), 2);
        assert_eq!(pages.breaks_after, vec![0]);
        assert!(ink_rows(&pages.pages[0]) > 0);
        assert!(ink_rows(&pages.pages[1]) > 0);
    }

    #[test]
    fn page_break_marker_ignored_when_disabled() {
        let pages = layout("one\n\n---PAGE---\n\ntwo", false);
        assert_eq!(pages.pages.len(), 1);
        assert!(pages.breaks_after.is_empty());
    }

    #[test]
    fn table_records_ordered_boundaries() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |";
        let pages = layout(md, false);
        let kinds: Vec<BoundaryKind> = pages.boundaries.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BoundaryKind::TableStart,
                BoundaryKind::Row,
                BoundaryKind::Row,
                BoundaryKind::TableEnd,
            ]
        );
        let ys: Vec<u32> = pages.boundaries.iter().map(|b| b.y).collect();
        let mut sorted = ys.clone();
        sorted.sort();
        assert_eq!(ys, sorted, "boundaries must be ascending within a page");
    }

    #[test]
    fn table_rows_are_heavy_with_ink() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |";
        let pages = layout(md, false);
        let page = &pages.pages[0];
        // The row boundary line spans the full width
        let row_y = pages.boundaries[1].y;
        let ink: usize = (0..page.width())
            .filter(|&x| page.get_pixel(x, row_y).0[0] < 250)
            .count();
        assert_eq!(ink as u32, page.width());
    }

    #[test]
    fn table_end_boundary_sits_below_bottom_rule() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |";
        let pages = layout(md, false);
        let page = &pages.pages[0];
        let end = *pages.boundaries.last().unwrap();
        assert_eq!(end.kind, BoundaryKind::TableEnd);
        let full_ink =
            |y: u32| (0..page.width()).all(|x| page.get_pixel(x, y).0[0] < 250);
        // A cut at the boundary keeps the closing rule with the slice above
        assert!(full_ink(end.y - 1));
        assert!(!full_ink(end.y));
    }

    #[test]
    fn wrap_splits_long_text() {
        let style = Styles::new(&RenderOptions::default()).para;
        let faces = FaceSet::builtin();
        let spans = vec![Span::plain("aaa bbb ccc ddd eee fff")];
        // Width fits roughly one word per line at builtin metrics
        let lines = wrap_spans(&spans, &style, &faces, 60);
        assert!(lines.len() >= 5, "got {} lines", lines.len());
    }

    #[test]
    fn wrap_hard_splits_oversized_word() {
        let style = Styles::new(&RenderOptions::default()).para;
        let faces = FaceSet::builtin();
        let spans = vec![Span::plain("abcdefghijklmnop")];
        let lines = wrap_spans(&spans, &style, &faces, 48);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line_width(line, &faces, style.px) <= 48);
        }
    }

    #[test]
    fn hard_break_forces_new_line() {
        let style = Styles::new(&RenderOptions::default()).para;
        let faces = FaceSet::builtin();
        let spans = vec![Span::plain("a\nb")];
        let lines = wrap_spans(&spans, &style, &faces, 1000);
        assert_eq!(lines.len(), 2);
    }
}
