//! Upload ingestion: decode, render, derive, persist.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::render::{RenderError, RenderService};
use crate::application::repos::{PostsWriteRepo, RepoError, TopicsRepo, UpsertPostParams};
use crate::application::tagging::TopicMatcher;
use crate::domain::entities::{MAX_TITLE_CHARS, PostRecord};
use crate::domain::read_time::read_time;
use crate::domain::slug::derive_slug;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload is not valid UTF-8")]
    Decode(#[from] std::str::Utf8Error),
    #[error("invalid upload: {0}")]
    Validation(String),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Orchestrates the ingestion pipeline: every step up to persistence is a
/// pure transformation, so a failure anywhere aborts with no partial write.
pub struct IngestService {
    render: Arc<RenderService>,
    posts_write: Arc<dyn PostsWriteRepo>,
    topics: Arc<dyn TopicsRepo>,
    matcher: Arc<dyn TopicMatcher>,
}

impl IngestService {
    pub fn new(
        render: Arc<RenderService>,
        posts_write: Arc<dyn PostsWriteRepo>,
        topics: Arc<dyn TopicsRepo>,
        matcher: Arc<dyn TopicMatcher>,
    ) -> Self {
        Self {
            render,
            posts_write,
            topics,
            matcher,
        }
    }

    /// Ingest one uploaded file. The filename stem (text before the first
    /// `.`) becomes the title; the extension is discarded.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<PostRecord, IngestError> {
        let title = title_from_filename(filename)?;
        let markdown = std::str::from_utf8(bytes)?;

        let started = Instant::now();
        let document = self.render.render(markdown)?;
        histogram!("penna_render_seconds").record(started.elapsed().as_secs_f64());

        let slug = derive_slug(&title);
        let read_time = read_time(&document.plain_text);
        let topic_ids = self.matching_topic_ids(&document.plain_text).await?;

        let post = self
            .posts_write
            .upsert_by_title(UpsertPostParams {
                title: title.clone(),
                slug,
                body: document.html,
                toc: document.toc,
                description: document.description,
                source: document.source,
                read_time,
            })
            .await?;

        if !topic_ids.is_empty() {
            self.posts_write
                .attach_topics(post.id, &topic_ids)
                .await?;
        }

        counter!("penna_uploads_total").increment(1);
        info!(
            target = "penna::ingest",
            title = %post.title,
            slug = %post.slug,
            topics = topic_ids.len(),
            "post ingested",
        );

        Ok(post)
    }

    async fn matching_topic_ids(&self, text: &str) -> Result<Vec<Uuid>, IngestError> {
        let topics = self.topics.list_all().await?;
        Ok(topics
            .into_iter()
            .filter(|topic| self.matcher.matches(&topic.name, text))
            .map(|topic| topic.id)
            .collect())
    }
}

fn title_from_filename(filename: &str) -> Result<String, IngestError> {
    let stem = filename.split('.').next().unwrap_or_default().trim();
    if stem.is_empty() {
        return Err(IngestError::Validation(
            "filename does not yield a title".to_string(),
        ));
    }
    if stem.chars().count() > MAX_TITLE_CHARS {
        return Err(IngestError::Validation(format!(
            "title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(stem.to_string())
}
