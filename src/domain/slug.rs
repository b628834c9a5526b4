//! Deterministic, length-bounded slug derivation.
//!
//! Bridges ASCII slugification (`slug` crate) with Chinese transliteration
//! (`pinyin` crate) so inputs like “基础教程” become `ji-chu-jiao-cheng`, then
//! truncates to the URL length cap at a word boundary. Inputs with no
//! ASCII-representable characters fall back to a stable digest-derived slug,
//! so derivation is total: every title yields a usable slug.

use std::collections::HashMap;

use pinyin::{Pinyin, ToPinyin};
use sha2::{Digest, Sha256};
use slug::slugify;

use super::entities::MAX_SLUG_CHARS;

/// Derive a slug from the provided human-readable text, at most
/// [`MAX_SLUG_CHARS`] characters long.
pub fn derive_slug(input: &str) -> String {
    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return digest_slug(input);
    }

    truncate_slug(&candidate, MAX_SLUG_CHARS)
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings processed in order receive monotonic suffixes when duplicates
/// occur (e.g. `section`, `section-2`, `section-3`).
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self {
            occurrences: HashMap::new(),
        }
    }

    /// Generate an anchor for the provided heading text, unique within this
    /// slugger.
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let base = derive_slug(heading);
        let count = self.occurrences.entry(base.clone()).or_insert(0);
        *count += 1;

        if *count == 1 {
            base
        } else {
            format!("{base}-{}", *count)
        }
    }
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => {
                // Preserve unhandled characters so slugify can decide how to filter them.
                output.push(ch);
            }
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

/// Cut an ASCII slug down to `max` characters, preferring the last hyphen
/// boundary inside the cap so truncation does not leave half a word.
fn truncate_slug(slug: &str, max: usize) -> String {
    if slug.len() <= max {
        return slug.to_string();
    }

    let head = &slug[..max];
    let cut = match head.rfind('-') {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head,
    };
    cut.trim_end_matches('-').to_string()
}

fn digest_slug(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    format!("post-{}", &hex::encode(digest)[..12])
}
