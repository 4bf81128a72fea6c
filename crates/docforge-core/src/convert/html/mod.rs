//! HTML to PDF.
//!
//! A small in-process renderer: block and inline structure, headings,
//! lists, preformatted text and rules, typeset with the standard PDF fonts.
//! Stylesheets, scripts and images are ignored.

mod fonts;
mod layout;
mod parse;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};
use tracing::{debug, warn};

use self::fonts::Face;
use self::layout::{DrawOp, Page};
use self::parse::Token;
use super::writer::PdfBuilder;
use crate::config::HtmlConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct HtmlConverter {
    config: HtmlConfig,
}

impl HtmlConverter {
    pub const fn new(config: HtmlConfig) -> Self {
        Self { config }
    }

    /// Render UTF-8 encoded HTML.
    ///
    /// With `render_errors_as_pdf` set, a renderer failure produces a
    /// one-page PDF describing it instead of an error.
    pub fn convert(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let html = std::str::from_utf8(bytes)
            .map_err(|e| Error::Decoding(format!("HTML is not valid UTF-8: {e}")))?;
        let html = html.strip_prefix('\u{feff}').unwrap_or(html);

        match self.render(html) {
            Err(Error::Rendering(reason)) if self.config.render_errors_as_pdf => {
                warn!("Rendering failed, returning error page: {}", reason);
                self.error_page(&reason)
            }
            other => other,
        }
    }

    pub fn render(&self, html: &str) -> Result<Vec<u8>> {
        let tokens = parse::tokenize(html);
        let pages = layout::layout(&tokens, &self.config)?;
        debug!("Laid out {} bytes of HTML on {} pages", html.len(), pages.len());
        self.write(&pages)
    }

    fn error_page(&self, reason: &str) -> Result<Vec<u8>> {
        let tokens = [
            start("h1"),
            Token::Text("Rendering failed".to_string()),
            end("h1"),
            start("p"),
            Token::Text(reason.to_string()),
            end("p"),
        ];
        let config = HtmlConfig {
            max_pages: 1,
            ..self.config.clone()
        };
        let pages = layout::layout(&tokens, &config)?;
        self.write(&pages)
    }

    fn write(&self, pages: &[Page]) -> Result<Vec<u8>> {
        let mut builder = PdfBuilder::new();

        let mut fonts = Dictionary::new();
        for face in Face::ALL {
            let font_id = builder.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(face.base_font().as_bytes().to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ]));
            fonts.set(face.resource(), Object::Reference(font_id));
        }
        let fonts_id = builder.add_object(fonts);

        for page in pages {
            let resources = Dictionary::from_iter([("Font", Object::Reference(fonts_id))]);
            builder.add_page(
                self.config.page_width,
                self.config.page_height,
                resources,
                page_content(page)?,
            );
        }

        builder
            .finish(true)
            .map_err(|e| Error::Rendering(format!("failed to write PDF: {e}")))
    }
}

fn start(name: &str) -> Token {
    Token::Start {
        name: name.to_string(),
    }
}

fn end(name: &str) -> Token {
    Token::End {
        name: name.to_string(),
    }
}

fn page_content(page: &Page) -> Result<Vec<u8>> {
    let mut operations = Vec::with_capacity(page.ops.len() * 5);
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                face,
                size,
                text,
            } => operations.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(face.resource().as_bytes().to_vec()),
                        Object::Real(*size),
                    ],
                ),
                Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(fonts::encode(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]),
            DrawOp::Rule { x1, x2, y, width } => operations.extend([
                Operation::new("w", vec![Object::Real(*width)]),
                Operation::new("m", vec![Object::Real(*x1), Object::Real(*y)]),
                Operation::new("l", vec![Object::Real(*x2), Object::Real(*y)]),
                Operation::new("S", vec![]),
            ]),
        }
    }

    Content { operations }
        .encode()
        .map_err(|e| Error::Rendering(format!("failed to encode page content: {e}")))
}
