//! Streaming post-processing of sanitized HTML: heading anchors, external
//! link annotation, and markup stripping.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};
use url::Url;

use super::RenderError;
use super::ast::HeadingInfo;

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Stamp collected anchors onto headings (in document order) and annotate
/// external links: open in a new tab, no referrer leakage, title fallback.
pub(crate) fn post_process(html: &str, headings: &[HeadingInfo]) -> Result<String, RenderError> {
    let anchors: Vec<String> = headings.iter().map(|h| h.anchor.clone()).collect();
    let cursor = Rc::new(RefCell::new(0usize));

    let mut handlers = Vec::new();
    for tag in HEADING_TAGS {
        let cursor = Rc::clone(&cursor);
        let anchors = anchors.clone();
        handlers.push(element!(tag, move |el| {
            let mut idx = cursor.borrow_mut();
            if let Some(anchor) = anchors.get(*idx) {
                el.set_attribute("id", anchor)?;
            }
            *idx += 1;
            Ok(())
        }));
    }

    handlers.push(element!("a[href]", |el| {
        if let Some(href) = el.get_attribute("href") {
            if is_external_http_url(&href) {
                el.set_attribute("target", "_blank")?;
                let rel = merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                el.set_attribute("rel", &rel)?;
                if el.get_attribute("title").is_none() {
                    el.set_attribute("title", &href)?;
                }
            }
        }
        Ok(())
    }));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(rewritten)
}

/// Collapse an HTML fragment down to its whitespace-normalized text content.
pub fn strip_markup(html: &str) -> Result<String, RenderError> {
    let buffer = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&buffer);

    rewrite_str(
        html,
        RewriteStrSettings {
            document_content_handlers: vec![doc_text!(move |chunk| {
                let mut buffer = sink.borrow_mut();
                buffer.push_str(chunk.as_str());
                if chunk.last_in_text_node() {
                    buffer.push(' ');
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    let text = buffer.borrow();
    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Render the collected headings (depth ≤ 3) as nested list markup, or `None`
/// when the document has no eligible headings.
pub(crate) fn build_toc(headings: &[HeadingInfo]) -> Option<String> {
    let entries: Vec<&HeadingInfo> = headings.iter().filter(|h| h.level <= 3).collect();
    if entries.is_empty() {
        return None;
    }

    let mut out = String::from("<nav class=\"toc\">");
    let mut level_stack: Vec<u8> = Vec::new();

    for entry in entries {
        match level_stack.last() {
            None => {
                out.push_str("<ul>");
                level_stack.push(entry.level);
            }
            Some(&current) if entry.level > current => {
                out.push_str("<ul>");
                level_stack.push(entry.level);
            }
            Some(_) => {
                while let Some(&current) = level_stack.last() {
                    if level_stack.len() == 1 || entry.level >= current {
                        break;
                    }
                    out.push_str("</li></ul>");
                    level_stack.pop();
                }
                out.push_str("</li>");
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            entry.anchor,
            escape_html(&entry.text)
        ));
    }

    while level_stack.pop().is_some() {
        out.push_str("</li></ul>");
    }
    out.push_str("</nav>");

    Some(out)
}

fn is_external_http_url(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: Vec<String> = existing
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    for token in required {
        if !tokens.iter().any(|t| t == token) {
            tokens.push((*token).to_string());
        }
    }

    tokens.join(" ")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
