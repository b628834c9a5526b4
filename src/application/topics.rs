//! Topic management: creation with retroactive tagging, and deletion.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::render::{RenderError, strip_markup};
use crate::application::repos::{
    PostsRepo, PostsWriteRepo, RepoError, TopicsRepo, TopicsWriteRepo,
};
use crate::application::tagging::TopicMatcher;
use crate::domain::entities::{TopicRecord, normalize_topic_name};

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("topic name must not be empty")]
    EmptyName,
    #[error("topic `{name}` not found")]
    NotFound { name: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Outcome of a creation attempt: a case-insensitive collision with an
/// existing topic is absorbed silently, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicOutcome {
    Created { topic: TopicRecord, tagged_posts: usize },
    AlreadyExists(TopicRecord),
}

pub struct TopicService {
    topics: Arc<dyn TopicsRepo>,
    topics_write: Arc<dyn TopicsWriteRepo>,
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    matcher: Arc<dyn TopicMatcher>,
}

impl TopicService {
    pub fn new(
        topics: Arc<dyn TopicsRepo>,
        topics_write: Arc<dyn TopicsWriteRepo>,
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        matcher: Arc<dyn TopicMatcher>,
    ) -> Self {
        Self {
            topics,
            topics_write,
            posts,
            posts_write,
            matcher,
        }
    }

    /// Create a topic and retroactively tag every existing post whose text
    /// contains it. The duplicate path skips the scan entirely.
    pub async fn create(&self, name: &str) -> Result<TopicOutcome, TopicError> {
        let normalized = normalize_topic_name(name);
        if normalized.is_empty() {
            return Err(TopicError::EmptyName);
        }

        if let Some(existing) = self.topics.find_by_name_ci(&normalized).await? {
            return Ok(TopicOutcome::AlreadyExists(existing));
        }

        let topic = self.topics_write.create(&normalized).await?;
        let tagged_posts = self.tag_existing_posts(&topic).await?;

        info!(
            target = "penna::topics",
            name = %topic.name,
            tagged_posts,
            "topic created",
        );

        Ok(TopicOutcome::Created { topic, tagged_posts })
    }

    /// Delete a topic by exact name. Association rows go with it; posts are
    /// untouched.
    pub async fn delete(&self, name: &str) -> Result<(), TopicError> {
        let topic = self
            .topics
            .find_by_name(name)
            .await?
            .ok_or_else(|| TopicError::NotFound {
                name: name.to_string(),
            })?;

        self.topics_write.delete(topic.id).await?;
        info!(target = "penna::topics", name = %topic.name, "topic deleted");
        Ok(())
    }

    async fn tag_existing_posts(&self, topic: &TopicRecord) -> Result<usize, TopicError> {
        let mut tagged = 0;
        for post in self.posts.list_all().await? {
            let text = strip_markup(&post.body)?;
            if self.matcher.matches(&topic.name, &text) {
                self.posts_write.attach_topics(post.id, &[topic.id]).await?;
                tagged += 1;
            }
        }
        Ok(tagged)
    }
}
