//! HTML to a flat token stream.
//!
//! The document goes through the HTML5 tree builder, so malformed markup is
//! recovered the way browsers do it (implied end tags, omitted `</head>`,
//! unclosed elements). The tree is then walked into start/end/text tokens,
//! leaving out everything that is never rendered.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start { name: String },
    End { name: String },
    Text(String),
}

/// Elements whose subtree is skipped entirely.
const SKIPPED: &[&str] = &["head", "script", "style", "template", "noscript"];

enum Visit {
    Enter(Handle),
    Leave(String),
}

pub fn tokenize(html: &str) -> Vec<Token> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);

    let mut tokens = Vec::new();
    // Explicit stack: nesting depth is up to the document
    let mut stack = vec![Visit::Enter(dom.document.clone())];

    while let Some(visit) = stack.pop() {
        let node = match visit {
            Visit::Leave(name) => {
                tokens.push(Token::End { name });
                continue;
            }
            Visit::Enter(node) => node,
        };

        match &node.data {
            NodeData::Document => {}
            NodeData::Text { contents } => push_text(&mut tokens, &contents.borrow()),
            NodeData::Element { name, .. } => {
                let name = name.local.to_string();
                if SKIPPED.contains(&name.as_str()) {
                    continue;
                }
                tokens.push(Token::Start { name: name.clone() });
                stack.push(Visit::Leave(name));
            }
            NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => continue,
        }

        stack.extend(
            node.children
                .borrow()
                .iter()
                .rev()
                .map(|child| Visit::Enter(child.clone())),
        );
    }

    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}
