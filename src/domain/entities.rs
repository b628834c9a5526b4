use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum length of a post title, enforced at ingestion and in the schema.
pub const MAX_TITLE_CHARS: usize = 128;

/// Maximum length of a derived slug or heading anchor.
pub const MAX_SLUG_CHARS: usize = 64;

/// Maximum length of the plaintext description excerpt.
pub const MAX_DESCRIPTION_CHARS: usize = 128;

/// A stored post. `body` is processed HTML; `toc` and `source` hold the
/// fragments the render pipeline extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub toc: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub read_time: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// Normalize a topic name to its canonical capitalized form: first character
/// uppercased, the rest lowercased. Caseless scripts pass through unchanged.
pub fn normalize_topic_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => {
            let mut normalized: String = first.to_uppercase().collect();
            normalized.extend(chars.flat_map(|c| c.to_lowercase()));
            normalized
        }
        None => String::new(),
    }
}
