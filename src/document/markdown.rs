//! Markdown dialect parser.
//!
//! Folds pulldown-cmark events into the restricted block model the layout
//! engine understands: styled paragraphs and headings 1-3, flat lists,
//! blockquotes, fenced code blocks, GFM pipe tables with per-column
//! alignment, and the reserved page-break marker line.
//!
//! Inline styles are the dialect's exactly: `***x***` bold-italic, `**x**`
//! bold, `*x*` italic, `` `x` `` monospace. Anything outside the dialect
//! (links, images, strikethrough, rules) degrades to its plain text.

use pulldown_cmark::{Alignment, Event, Options, Parser, Tag, TagEnd};

/// Reserved marker line requesting an unconditional page break.
/// Only honored by the layout engine when pagination is enabled.
pub const PAGE_BREAK_MARKER: &str = "---PAGE---";

/// Inline style flags carried by a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

/// A run of text with a single style. Text may contain `\n` only for
/// explicit hard breaks; the layout engine wraps on those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            style: SpanStyle::default(),
        }
    }
}

/// Horizontal alignment of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// One block-level element of the restricted dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    Paragraph {
        spans: Vec<Span>,
    },
    List {
        start: Option<u64>,
        items: Vec<Vec<Span>>,
    },
    Quote {
        lines: Vec<Vec<Span>>,
    },
    CodeBlock {
        text: String,
    },
    Table {
        aligns: Vec<CellAlign>,
        header: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    PageBreak,
}

/// Parse markdown text into dialect blocks.
pub fn parse(text: &str) -> Vec<Block> {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES);
    let mut state = Collector::default();

    for event in parser {
        match event {
            Event::Start(tag) => state.start(tag),
            Event::End(tag_end) => state.end(tag_end),
            Event::Text(t) => state.text(&t),
            Event::Code(c) => state.inline_code(&c),
            Event::SoftBreak => state.text(" "),
            Event::HardBreak => state.text("\n"),
            // Rules are not part of the dialect; skip them.
            _ => {}
        }
    }

    state.blocks
}

#[derive(Default)]
struct ListFrame {
    start: Option<u64>,
    items: Vec<Vec<Span>>,
    current_item: Option<Vec<Span>>,
}

#[derive(Default)]
struct TableFrame {
    aligns: Vec<CellAlign>,
    header: Vec<Vec<Span>>,
    rows: Vec<Vec<Vec<Span>>>,
    current_row: Vec<Vec<Span>>,
    in_head: bool,
}

#[derive(Default)]
struct Collector {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    bold: u32,
    italic: u32,
    heading: Option<u8>,
    code_block: Option<String>,
    quote_depth: u32,
    quote_lines: Vec<Vec<Span>>,
    lists: Vec<ListFrame>,
    table: Option<TableFrame>,
    cell: Option<Vec<Span>>,
}

impl Collector {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            code: false,
        }
    }

    /// The span buffer text currently flows into: table cell, list item,
    /// or the top-level paragraph buffer.
    fn current_spans(&mut self) -> &mut Vec<Span> {
        if let Some(cell) = self.cell.as_mut() {
            return cell;
        }
        if let Some(frame) = self.lists.last_mut()
            && let Some(item) = frame.current_item.as_mut()
        {
            return item;
        }
        &mut self.spans
    }

    fn push_span(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        let target = self.current_spans();
        // Merge adjacent spans of the same style
        if let Some(last) = target.last_mut()
            && last.style == style
        {
            last.text.push_str(text);
            return;
        }
        target.push(Span {
            text: text.to_string(),
            style,
        });
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = self.code_block.as_mut() {
            code.push_str(text);
            return;
        }
        let style = self.style();
        self.push_span(text, style);
    }

    fn inline_code(&mut self, code: &str) {
        let style = SpanStyle {
            code: true,
            ..self.style()
        };
        self.push_span(code, style);
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                // Dialect has three heading levels; deeper ones clamp.
                self.heading = Some((level as u8).min(3));
            }
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::CodeBlock(_) => self.code_block = Some(String::new()),
            Tag::BlockQuote(..) => self.quote_depth += 1,
            Tag::List(start) => self.lists.push(ListFrame {
                start,
                ..Default::default()
            }),
            Tag::Item => {
                if let Some(frame) = self.lists.last_mut() {
                    frame.current_item = Some(Vec::new());
                }
            }
            Tag::Table(aligns) => {
                self.table = Some(TableFrame {
                    aligns: aligns.iter().map(|a| map_align(*a)).collect(),
                    ..Default::default()
                });
            }
            Tag::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.in_head = true;
                }
            }
            Tag::TableRow => {
                if let Some(t) = self.table.as_mut() {
                    t.current_row.clear();
                }
            }
            Tag::TableCell => self.cell = Some(Vec::new()),
            _ => {}
        }
    }

    fn end(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => self.finish_paragraph(),
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                let spans = std::mem::take(&mut self.spans);
                if !spans.is_empty() {
                    self.blocks.push(Block::Heading { level, spans });
                }
            }
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::CodeBlock => {
                if let Some(mut text) = self.code_block.take() {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.blocks.push(Block::CodeBlock { text });
                }
            }
            TagEnd::BlockQuote(..) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    let lines = std::mem::take(&mut self.quote_lines);
                    if !lines.is_empty() {
                        self.blocks.push(Block::Quote { lines });
                    }
                }
            }
            TagEnd::Item => {
                if let Some(frame) = self.lists.last_mut()
                    && let Some(item) = frame.current_item.take()
                {
                    frame.items.push(item);
                }
            }
            TagEnd::List(_) => {
                if let Some(frame) = self.lists.pop()
                    && !frame.items.is_empty()
                {
                    self.blocks.push(Block::List {
                        start: frame.start,
                        items: frame.items,
                    });
                }
            }
            TagEnd::TableCell => {
                if let Some(cell) = self.cell.take()
                    && let Some(t) = self.table.as_mut()
                {
                    if t.in_head {
                        t.header.push(cell);
                    } else {
                        t.current_row.push(cell);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.in_head = false;
                }
            }
            TagEnd::TableRow => {
                if let Some(t) = self.table.as_mut() {
                    let row = std::mem::take(&mut t.current_row);
                    t.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(t) = self.table.take()
                    && !t.header.is_empty()
                {
                    self.blocks.push(Block::Table {
                        aligns: t.aligns,
                        header: t.header,
                        rows: t.rows,
                    });
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        if self.quote_depth > 0 {
            let spans = std::mem::take(&mut self.spans);
            if !spans.is_empty() {
                self.quote_lines.push(spans);
            }
            return;
        }
        if let Some(frame) = self.lists.last_mut() {
            // Multi-paragraph list items join with a space
            if let Some(item) = frame.current_item.as_mut()
                && !item.is_empty()
            {
                item.push(Span::plain(" "));
            }
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        if spans.is_empty() {
            return;
        }
        if is_page_break(&spans) {
            self.blocks.push(Block::PageBreak);
        } else {
            self.blocks.push(Block::Paragraph { spans });
        }
    }
}

fn is_page_break(spans: &[Span]) -> bool {
    spans.len() == 1
        && spans[0].style == SpanStyle::default()
        && spans[0].text.trim() == PAGE_BREAK_MARKER
}

fn map_align(align: Alignment) -> CellAlign {
    match align {
        Alignment::Center => CellAlign::Center,
        Alignment::Right => CellAlign::Right,
        Alignment::None | Alignment::Left => CellAlign::Left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain_text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn bold_italic_and_code_spans() {
        let blocks = parse("***both*** **bold** *italic* `mono`");
        let Block::Paragraph { spans } = &blocks[0] else {
            panic!("expected paragraph, got {:?}", blocks[0]);
        };
        let find = |text: &str| {
            spans
                .iter()
                .find(|s| s.text.trim() == text)
                .unwrap_or_else(|| panic!("missing span {text:?}"))
        };
        assert!(find("both").style.bold && find("both").style.italic);
        assert!(find("bold").style.bold && !find("bold").style.italic);
        assert!(find("italic").style.italic && !find("italic").style.bold);
        assert!(find("mono").style.code);
    }

    #[test]
    fn heading_levels_clamp_to_three() {
        let blocks = parse("# One\n\n## Two\n\n### Three\n\n##### Five");
        let levels: Vec<u8> = blocks
            .iter()
            .map(|b| match b {
                Block::Heading { level, .. } => *level,
                other => panic!("expected heading, got {other:?}"),
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 3]);
    }

    #[test]
    fn unordered_and_ordered_lists() {
        let blocks = parse("- a\n- b\n\n3. x\n4. y");
        assert_eq!(blocks.len(), 2);
        let Block::List { start: None, items } = &blocks[0] else {
            panic!("expected unordered list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(plain_text(&items[0]), "a");
        let Block::List {
            start: Some(3),
            items,
        } = &blocks[1]
        else {
            panic!("expected ordered list starting at 3");
        };
        assert_eq!(plain_text(&items[1]), "y");
    }

    #[test]
    fn blockquote_collects_lines() {
        let blocks = parse("> first\n\n> second line");
        // Two separate quotes
        assert_eq!(blocks.len(), 2);
        let Block::Quote { lines } = &blocks[0] else {
            panic!("expected quote");
        };
        assert_eq!(plain_text(&lines[0]), "first");
    }

    #[test]
    fn fenced_code_preserves_whitespace() {
        let blocks = parse("```\nfn main() {\n    body\n}\n```");
        let Block::CodeBlock { text } = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(text, "fn main() {\n    body\n}");
    }

    #[test]
    fn pipe_table_with_alignment_row() {
        let md = "| a | b | c |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n| 4 | 5 | 6 |";
        let blocks = parse(md);
        let Block::Table {
            aligns,
            header,
            rows,
        } = &blocks[0]
        else {
            panic!("expected table, got {:?}", blocks[0]);
        };
        assert_eq!(
            aligns,
            &vec![CellAlign::Left, CellAlign::Center, CellAlign::Right]
        );
        assert_eq!(header.len(), 3);
        assert_eq!(rows.len(), 2);
        assert_eq!(plain_text(&rows[1][2]), "6");
    }

    #[test]
    fn page_break_marker_detected() {
        let blocks = parse("before\n\n---PAGE---\n\nafter");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], Block::PageBreak);
    }

    #[test]
    fn marker_with_styling_is_just_text() {
        let blocks = parse("**---PAGE---**");
        assert!(matches!(blocks[0], Block::Paragraph { .. }));
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
    }
}
