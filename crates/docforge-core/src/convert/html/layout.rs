//! Flow layout: tokens to positioned text runs and rules on fixed-size pages.
//!
//! Coordinates are PDF user space, origin bottom-left. Text is greedily
//! wrapped at whitespace; a word wider than the line is broken between
//! characters. Preformatted text keeps its spaces and line breaks.

use super::fonts::Face;
use super::parse::Token;
use crate::config::HtmlConfig;
use crate::error::{Error, Result};

/// Line height as a multiple of the largest font size on the line.
const LINE_SPACING: f32 = 1.25;
/// Horizontal indent per list or blockquote level.
const INDENT_STEP: f32 = 24.0;
const MARKER_GAP: f32 = 4.0;
const RULE_WIDTH: f32 = 0.75;
/// Heading sizes relative to body text, `h1` first.
const HEADING_SCALE: [f32; 6] = [2.0, 1.5, 1.25, 1.1, 1.0, 0.9];

/// Elements that end the current paragraph.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "body", "dd", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "header", "main", "nav", "p", "section", "table", "tr",
];

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        face: Face,
        size: f32,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        width: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

/// Lay out `tokens`, failing when the result needs more than
/// `config.max_pages` pages. Always yields at least one page.
pub fn layout(tokens: &[Token], config: &HtmlConfig) -> Result<Vec<Page>> {
    let mut layout = Layout::new(config);
    for token in tokens {
        match token {
            Token::Start { name } => layout.start(name)?,
            Token::End { name } => layout.end(name)?,
            Token::Text(text) => layout.text(text)?,
        }
    }
    layout.finish()
}

struct Run {
    /// Offset from the start of the line
    x: f32,
    face: Face,
    size: f32,
    text: String,
}

#[derive(Default)]
struct Line {
    runs: Vec<Run>,
    width: f32,
    size: f32,
}

enum List {
    Bullet,
    Numbered(u32),
}

struct Layout<'a> {
    config: &'a HtmlConfig,
    pages: Vec<Page>,
    page: Page,
    /// Top of the next line
    top: f32,
    line: Line,
    space_pending: bool,
    marker: Option<String>,
    /// Content was emitted since the last paragraph gap
    gap_due: bool,

    bold: usize,
    italic: usize,
    mono: usize,
    pre: usize,
    hidden: usize,
    quote: usize,
    heading: Option<usize>,
    lists: Vec<List>,
}

impl<'a> Layout<'a> {
    fn new(config: &'a HtmlConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            page: Page::default(),
            top: config.page_height - config.margin,
            line: Line::default(),
            space_pending: false,
            marker: None,
            gap_due: false,
            bold: 0,
            italic: 0,
            mono: 0,
            pre: 0,
            hidden: 0,
            quote: 0,
            heading: None,
            lists: Vec::new(),
        }
    }

    fn face(&self) -> Face {
        Face::select(self.bold > 0, self.italic > 0, self.mono > 0)
    }

    fn size(&self) -> f32 {
        let scale = self.heading.map_or(1.0, |level| HEADING_SCALE[level - 1]);
        self.config.font_size * scale
    }

    fn left(&self) -> f32 {
        let content = self.config.page_width - 2.0 * self.config.margin;
        #[allow(clippy::cast_precision_loss)]
        let indent = INDENT_STEP * (self.lists.len() + self.quote) as f32;
        self.config.margin + indent.min(content / 2.0)
    }

    fn available(&self) -> f32 {
        self.config.page_width - self.config.margin - self.left()
    }

    fn start(&mut self, name: &str) -> Result<()> {
        match name {
            "br" => self.finish_line(true)?,
            "hr" => self.rule()?,
            "title" => self.hidden += 1,
            "b" | "strong" => self.bold += 1,
            "i" | "em" | "cite" | "var" | "dfn" => self.italic += 1,
            "code" | "tt" | "kbd" | "samp" => self.mono += 1,
            "pre" => {
                self.block_break()?;
                self.pre += 1;
                self.mono += 1;
            }
            "ul" | "menu" => {
                self.block_break()?;
                self.lists.push(List::Bullet);
            }
            "ol" => {
                self.block_break()?;
                self.lists.push(List::Numbered(0));
            }
            "li" => {
                self.finish_line(false)?;
                self.space_pending = false;
                self.marker = Some(match self.lists.last_mut() {
                    Some(List::Numbered(n)) => {
                        *n += 1;
                        format!("{n}.")
                    }
                    Some(List::Bullet) | None => "\u{2022}".to_string(),
                });
            }
            "blockquote" => {
                self.block_break()?;
                self.quote += 1;
            }
            "td" => self.space_pending = true,
            "th" => {
                self.space_pending = true;
                self.bold += 1;
            }
            _ => {
                if let Some(level) = heading_level(name) {
                    self.block_break()?;
                    self.heading = Some(level);
                    self.bold += 1;
                } else if BLOCKS.contains(&name) {
                    self.block_break()?;
                }
            }
        }
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        match name {
            "title" => self.hidden = self.hidden.saturating_sub(1),
            "b" | "strong" | "th" => self.bold = self.bold.saturating_sub(1),
            "i" | "em" | "cite" | "var" | "dfn" => self.italic = self.italic.saturating_sub(1),
            "code" | "tt" | "kbd" | "samp" => self.mono = self.mono.saturating_sub(1),
            "pre" => {
                self.block_break()?;
                self.pre = self.pre.saturating_sub(1);
                self.mono = self.mono.saturating_sub(1);
            }
            "ul" | "menu" | "ol" => {
                self.block_break()?;
                self.lists.pop();
            }
            "li" => self.finish_line(false)?,
            "blockquote" => {
                self.block_break()?;
                self.quote = self.quote.saturating_sub(1);
            }
            _ => {
                if heading_level(name).is_some() {
                    // Flush while the heading size still applies
                    self.block_break()?;
                    self.heading = None;
                    self.bold = self.bold.saturating_sub(1);
                } else if BLOCKS.contains(&name) {
                    self.block_break()?;
                }
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if self.hidden > 0 {
            return Ok(());
        }

        if self.pre > 0 {
            for (i, segment) in text.split('\n').enumerate() {
                if i > 0 {
                    self.finish_line(true)?;
                }
                let segment = segment.trim_end_matches('\r').replace('\t', "    ");
                if !segment.is_empty() {
                    self.add_chunks(&segment)?;
                }
            }
            return Ok(());
        }

        // Non-breaking spaces are part of the word
        let breaking = |c: char| c.is_whitespace() && c != '\u{a0}';
        let mut space = self.space_pending || text.starts_with(breaking);
        let mut any = false;
        for word in text.split(breaking).filter(|w| !w.is_empty()) {
            self.add_word(word, space)?;
            space = true;
            any = true;
        }
        self.space_pending = if any {
            text.ends_with(breaking)
        } else {
            space
        };
        Ok(())
    }

    fn add_word(&mut self, word: &str, space_before: bool) -> Result<()> {
        let face = self.face();
        let size = self.size();
        let width = face.text_width(word, size);
        let space = face.text_width(" ", size);

        if !self.line.runs.is_empty()
            && self.line.width + space + width > self.available()
        {
            self.finish_line(false)?;
        }
        if self.line.runs.is_empty() {
            if width > self.available() {
                return self.add_chunks(word);
            }
            self.place(word, face, size, 0.0);
        } else {
            self.place(word, face, size, if space_before { space } else { 0.0 });
        }
        Ok(())
    }

    /// Place `text` breaking between characters wherever the line is full.
    fn add_chunks(&mut self, text: &str) -> Result<()> {
        let face = self.face();
        let size = self.size();
        let mut chunk = String::new();
        let mut width = 0.0;

        for c in text.chars() {
            let advance = face.text_width(c.encode_utf8(&mut [0; 4]), size);
            let occupied = !chunk.is_empty() || !self.line.runs.is_empty();
            if occupied && self.line.width + width + advance > self.available() {
                if !chunk.is_empty() {
                    self.place(&chunk, face, size, 0.0);
                    chunk.clear();
                    width = 0.0;
                }
                self.finish_line(false)?;
            }
            chunk.push(c);
            width += advance;
        }
        if !chunk.is_empty() {
            self.place(&chunk, face, size, 0.0);
        }
        Ok(())
    }

    fn place(&mut self, text: &str, face: Face, size: f32, space: f32) {
        let width = face.text_width(text, size);
        match self.line.runs.last_mut() {
            Some(run) if run.face == face && (run.size - size).abs() < f32::EPSILON => {
                if space > 0.0 {
                    run.text.push(' ');
                }
                run.text.push_str(text);
            }
            _ => self.line.runs.push(Run {
                x: self.line.width + space,
                face,
                size,
                text: text.to_string(),
            }),
        }
        self.line.width += space + width;
        self.line.size = self.line.size.max(size);
    }

    /// Emit the current line. An empty line is only emitted when
    /// `keep_empty` is set or a list marker is waiting.
    fn finish_line(&mut self, keep_empty: bool) -> Result<()> {
        if self.line.runs.is_empty() && self.marker.is_none() && !keep_empty {
            return Ok(());
        }
        if self.hidden > 0 {
            self.line = Line::default();
            return Ok(());
        }

        let line = std::mem::take(&mut self.line);
        let size = if line.size > 0.0 { line.size } else { self.size() };
        let height = size * LINE_SPACING;
        self.reserve(height)?;

        let baseline = self.top - size;
        let left = self.left();

        if let Some(marker) = self.marker.take() {
            let marker_size = self.config.font_size;
            let width = Face::Regular.text_width(&marker, marker_size);
            self.page.ops.push(DrawOp::Text {
                x: (left - width - MARKER_GAP).max(0.0),
                y: baseline,
                face: Face::Regular,
                size: marker_size,
                text: marker,
            });
        }
        for run in line.runs {
            self.page.ops.push(DrawOp::Text {
                x: left + run.x,
                y: baseline,
                face: run.face,
                size: run.size,
                text: run.text,
            });
        }

        self.top -= height;
        self.space_pending = false;
        self.gap_due = true;
        Ok(())
    }

    /// End the paragraph, leaving half a line of space after content.
    fn block_break(&mut self) -> Result<()> {
        self.finish_line(false)?;
        self.space_pending = false;
        if self.gap_due {
            self.top -= self.config.font_size * 0.5;
            self.gap_due = false;
        }
        Ok(())
    }

    fn rule(&mut self) -> Result<()> {
        self.block_break()?;
        let height = self.config.font_size;
        self.reserve(height)?;
        self.page.ops.push(DrawOp::Rule {
            x1: self.left(),
            x2: self.config.page_width - self.config.margin,
            y: self.top - height / 2.0,
            width: RULE_WIDTH,
        });
        self.top -= height;
        self.gap_due = true;
        Ok(())
    }

    /// Start a new page unless `height` still fits on this one. Content
    /// taller than a whole page is placed on an empty page regardless.
    fn reserve(&mut self, height: f32) -> Result<()> {
        if self.top - height >= self.config.margin || self.page.ops.is_empty() {
            return Ok(());
        }
        if self.pages.len() + 1 >= self.config.max_pages {
            return Err(Error::Rendering(format!(
                "document exceeds the limit of {} pages",
                self.config.max_pages
            )));
        }
        self.pages.push(std::mem::take(&mut self.page));
        self.top = self.config.page_height - self.config.margin;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Page>> {
        self.finish_line(false)?;
        self.pages.push(self.page);
        Ok(self.pages)
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => Some(usize::from(level - b'0')),
        _ => None,
    }
}
