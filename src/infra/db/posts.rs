use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    PostsRepo, PostsWriteRepo, RepoError, UpsertPostParams,
};
use crate::domain::entities::{PostRecord, TopicRecord};

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str =
    "id, title, slug, body, toc, description, source, read_time, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    slug: String,
    body: String,
    toc: Option<String>,
    description: Option<String>,
    source: Option<String>,
    read_time: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            body: row.body,
            toc: row.toc,
            description: row.description,
            source: row.source,
            read_time: row.read_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        // Slugs are not unique; resolve to the most recently updated match.
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE title = $1"
        ))
        .bind(title)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn topics_for(&self, post_id: Uuid) -> Result<Vec<TopicRecord>, RepoError> {
        let rows = sqlx::query_as::<_, (Uuid, String, OffsetDateTime)>(
            "SELECT t.id, t.name, t.created_at \
             FROM topics t \
             INNER JOIN post_topics pt ON pt.topic_id = t.id \
             WHERE pt.post_id = $1 \
             ORDER BY t.name ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, name, created_at)| TopicRecord {
                id,
                name,
                created_at,
            })
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn upsert_by_title(&self, params: UpsertPostParams) -> Result<PostRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts \
                (id, title, slug, body, toc, description, source, read_time, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             ON CONFLICT (title) DO UPDATE SET \
                slug = EXCLUDED.slug, \
                body = EXCLUDED.body, \
                toc = EXCLUDED.toc, \
                description = EXCLUDED.description, \
                source = EXCLUDED.source, \
                read_time = EXCLUDED.read_time, \
                updated_at = EXCLUDED.updated_at \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&params.title)
        .bind(&params.slug)
        .bind(&params.body)
        .bind(&params.toc)
        .bind(&params.description)
        .bind(&params.source)
        .bind(&params.read_time)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn attach_topics(&self, post_id: Uuid, topic_ids: &[Uuid]) -> Result<(), RepoError> {
        if topic_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO post_topics (post_id, topic_id) \
             SELECT $1, x.topic_id FROM UNNEST($2::uuid[]) AS x(topic_id) \
             ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(topic_ids)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
