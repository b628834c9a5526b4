use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, TopicsRepo, TopicsWriteRepo};
use crate::domain::entities::TopicRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TopicRow {
    id: Uuid,
    name: String,
    created_at: OffsetDateTime,
}

impl From<TopicRow> for TopicRecord {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TopicsRepo for PostgresRepositories {
    async fn list_all(&self) -> Result<Vec<TopicRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, created_at FROM topics ORDER BY LOWER(name)",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TopicRecord::from).collect())
    }

    async fn find_by_name_ci(&self, name: &str) -> Result<Option<TopicRecord>, RepoError> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, created_at FROM topics WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TopicRecord::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TopicRecord>, RepoError> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, created_at FROM topics WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TopicRecord::from))
    }
}

#[async_trait]
impl TopicsWriteRepo for PostgresRepositories {
    async fn create(&self, name: &str) -> Result<TopicRecord, RepoError> {
        let row = sqlx::query_as::<_, TopicRow>(
            "INSERT INTO topics (id, name, created_at) VALUES ($1, $2, $3) \
             RETURNING id, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        // Association rows go with the topic via ON DELETE CASCADE.
        sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
