//! The Markdown processing pipeline.
//!
//! A post body travels through fixed stages: comrak parse, AST rewrite
//! (CJK spacing, heading anchors, source-block detachment), HTML render with
//! syntect code-fence highlighting, ammonia sanitization, and a streaming
//! post-process that stamps heading ids and annotates external links. The
//! pipeline also yields the derived fragments the store persists alongside
//! the body: TOC markup, the detached source fragment, the plaintext
//! description, and the markup-free document text.

mod ast;
mod html;
mod sanitize;

use comrak::{
    Arena, Options, Plugins, format_html_with_plugins, parse_document,
    plugins::syntect::SyntectAdapter,
};
use thiserror::Error;

use crate::domain::entities::MAX_DESCRIPTION_CHARS;

pub use html::strip_markup;

const HIGHLIGHT_THEME: &str = "InspiredGitHub";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize rendered document: {0}")]
    Serialize(#[from] std::fmt::Error),
    #[error("rendered document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("html rewrite failed: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

/// Everything the pipeline derives from one Markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub html: String,
    pub toc: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    /// Markup-free, whitespace-collapsed document text (source block
    /// excluded), fed to the reading-time estimate and topic matching.
    pub plain_text: String,
}

/// Comrak-based renderer with syntect highlighting and ammonia sanitization.
pub struct RenderService {
    options: Options<'static>,
    adapter: SyntectAdapter,
    sanitizer: ammonia::Builder<'static>,
}

impl RenderService {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            adapter: SyntectAdapter::new(Some(HIGHLIGHT_THEME)),
            sanitizer: sanitize::build_sanitizer(),
        }
    }

    pub fn render(&self, markdown: &str) -> Result<RenderedDocument, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let outcome = ast::rewrite_ast(root);

        let mut plugins = Plugins::default();
        plugins.render.codefence_syntax_highlighter = Some(&self.adapter);

        let mut rendered = String::new();
        format_html_with_plugins(root, &self.options, &mut rendered, &plugins)?;

        let sanitized = self.sanitizer.clean(&rendered).to_string();
        let html = html::post_process(&sanitized, &outcome.headings)?;

        let plain_text = outcome
            .plain_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let description = derive_description(&plain_text);
        let toc = html::build_toc(&outcome.headings);
        let source = outcome
            .source
            .map(|raw| self.sanitizer.clean(&raw).to_string());

        Ok(RenderedDocument {
            html,
            toc,
            source,
            description,
            plain_text,
        })
    }
}

impl Default for RenderService {
    fn default() -> Self {
        Self::new()
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.cjk_friendly_emphasis = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    // Raw HTML passes through the parser so the source block survives to the
    // AST stage; ammonia owns the safety boundary afterwards.
    render.r#unsafe = true;

    options
}

/// Character-truncated plaintext excerpt; may split a word at the boundary.
fn derive_description(plain_text: &str) -> Option<String> {
    if plain_text.is_empty() {
        return None;
    }
    Some(plain_text.chars().take(MAX_DESCRIPTION_CHARS).collect())
}
