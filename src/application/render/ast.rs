//! AST-stage transformations: CJK spacing normalization, heading collection,
//! and detachment of the reserved source block.

use comrak::nodes::{AstNode, NodeValue};

use crate::domain::slug::AnchorSlugger;

/// Identifier that flags a raw HTML block as the post's citation source.
pub(crate) const SOURCE_BLOCK_ID: &str = "source";

#[derive(Debug, Clone)]
pub(crate) struct HeadingInfo {
    pub(crate) level: u8,
    pub(crate) text: String,
    pub(crate) anchor: String,
}

#[derive(Default)]
pub(crate) struct AstOutcome {
    pub(crate) headings: Vec<HeadingInfo>,
    /// Raw literal of the detached source block, if the document had one.
    pub(crate) source: Option<String>,
    /// Markup-free document text, block-separated by newlines.
    pub(crate) plain_text: String,
}

pub(crate) fn rewrite_ast<'a>(root: &'a AstNode<'a>) -> AstOutcome {
    let mut outcome = AstOutcome::default();
    let mut slugger = AnchorSlugger::new();
    let mut source_nodes: Vec<&'a AstNode<'a>> = Vec::new();

    normalize_text_nodes(root);

    for node in root.descendants() {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Heading(heading) => {
                let text = collect_inline_text(node);
                let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
                let anchor = slugger.anchor_for(&normalized);
                outcome.headings.push(HeadingInfo {
                    level: heading.level,
                    text: normalized,
                    anchor,
                });
            }
            NodeValue::HtmlBlock(block) => {
                if outcome.source.is_none() && is_source_block(&block.literal) {
                    outcome.source = Some(block.literal.trim().to_string());
                    source_nodes.push(node);
                }
            }
            _ => {}
        }
    }

    for node in source_nodes {
        node.detach();
    }

    outcome.plain_text = collect_plain_text(root);
    outcome
}

/// Insert a thin-space separator between adjacent CJK and Latin/digit runs in
/// every text node. Code spans and code blocks are untouched.
fn normalize_text_nodes<'a>(root: &'a AstNode<'a>) {
    for node in root.descendants() {
        let mut data = node.data.borrow_mut();
        if let NodeValue::Text(text) = &mut data.value {
            let normalized = normalize_cjk_spacing(text);
            if normalized != *text {
                *text = normalized.into();
            }
        }
    }
}

pub(crate) fn normalize_cjk_spacing(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        if let Some(last) = prev {
            if needs_separator(last, ch) {
                out.push('\u{2009}');
            }
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

fn needs_separator(a: char, b: char) -> bool {
    (is_cjk(a) && b.is_ascii_alphanumeric()) || (a.is_ascii_alphanumeric() && is_cjk(b))
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3400..=0x4DBF    // CJK extension A
        | 0x4E00..=0x9FFF  // CJK unified ideographs
        | 0xF900..=0xFAFF  // CJK compatibility ideographs
        | 0x3040..=0x30FF  // hiragana, katakana
        | 0xAC00..=0xD7AF  // hangul syllables
    )
}

/// Inline text of a node's subtree, without block separators. Used for
/// heading anchors.
fn collect_inline_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for child in node.descendants() {
        let data = child.data.borrow();
        match &data.value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Document text with newlines at block boundaries, whitespace-collapsed by
/// the caller's consumers (description, reading time, topic matching).
fn collect_plain_text<'a>(root: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for node in root.descendants() {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::CodeBlock(block) => {
                text.push('\n');
                text.push_str(&block.literal);
            }
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            NodeValue::Paragraph
            | NodeValue::Heading(_)
            | NodeValue::Item(_)
            | NodeValue::BlockQuote
            | NodeValue::Table(_)
            | NodeValue::TableRow(_) => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// A raw HTML block is the source block when its opening tag carries the
/// reserved id.
fn is_source_block(literal: &str) -> bool {
    let trimmed = literal.trim_start();
    if !trimmed.starts_with('<') {
        return false;
    }
    let Some(end) = trimmed.find('>') else {
        return false;
    };
    let tag = &trimmed[..end];
    tag.contains(&format!("id=\"{SOURCE_BLOCK_ID}\""))
        || tag.contains(&format!("id='{SOURCE_BLOCK_ID}'"))
}
