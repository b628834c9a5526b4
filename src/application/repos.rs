//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{PostRecord, TopicRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Everything the ingestion pipeline persists for a post, keyed by title.
#[derive(Debug, Clone)]
pub struct UpsertPostParams {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub toc: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub read_time: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;
    async fn find_by_title(&self, title: &str) -> Result<Option<PostRecord>, RepoError>;
    async fn topics_for(&self, post_id: Uuid) -> Result<Vec<TopicRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Insert a post, or overwrite the existing row with the same title and
    /// refresh its `updated_at`. `created_at` is set once on first insert.
    async fn upsert_by_title(&self, params: UpsertPostParams) -> Result<PostRecord, RepoError>;

    /// Attach topics to a post, ignoring associations that already exist.
    async fn attach_topics(&self, post_id: Uuid, topic_ids: &[Uuid]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TopicsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<TopicRecord>, RepoError>;

    /// Case-insensitive lookup, used to absorb duplicate creation attempts.
    async fn find_by_name_ci(&self, name: &str) -> Result<Option<TopicRecord>, RepoError>;

    /// Exact-name lookup, used by the deletion path.
    async fn find_by_name(&self, name: &str) -> Result<Option<TopicRecord>, RepoError>;
}

/// Liveness probe over the backing store, for the health endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TopicsWriteRepo: Send + Sync {
    async fn create(&self, name: &str) -> Result<TopicRecord, RepoError>;

    /// Remove the topic and its association rows; posts are untouched.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}
