#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use penna::application::auth::AuthService;
use penna::application::ingest::IngestService;
use penna::application::render::RenderService;
use penna::application::repos::{
    HealthProbe, PostsRepo, PostsWriteRepo, RepoError, TopicsRepo, TopicsWriteRepo,
    UpsertPostParams,
};
use penna::application::sitemap::{
    PostsProvider, SitemapProvider, SitemapService, StaticPagesProvider,
};
use penna::application::tagging::{LexiconMatcher, TopicMatcher};
use penna::application::topics::TopicService;
use penna::config::GithubSettings;
use penna::domain::entities::{PostRecord, TopicRecord};
use penna::infra::github::GithubClient;
use penna::infra::http::{AppState, build_router};
use penna::infra::session::SessionCodec;

pub const SITE_TITLE: &str = "Test Blog";
pub const ALLOWED_USER: &str = "octocat";
pub const SESSION_SECRET: &str = "integration-test-secret";

#[derive(Default)]
pub struct InMemoryStore {
    pub posts: Mutex<Vec<PostRecord>>,
    pub topics: Mutex<Vec<TopicRecord>>,
    pub links: Mutex<HashSet<(Uuid, Uuid)>>,
}

#[async_trait]
impl PostsRepo for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.posts.lock().await.clone())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let posts = self.posts.lock().await;
        let mut matches: Vec<&PostRecord> = posts.iter().filter(|p| p.slug == slug).collect();
        matches.sort_by_key(|p| p.updated_at);
        Ok(matches.last().map(|p| (*p).clone()))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<PostRecord>, RepoError> {
        let posts = self.posts.lock().await;
        Ok(posts.iter().find(|p| p.title == title).cloned())
    }

    async fn topics_for(&self, post_id: Uuid) -> Result<Vec<TopicRecord>, RepoError> {
        let links = self.links.lock().await;
        let topics = self.topics.lock().await;
        let mut attached: Vec<TopicRecord> = topics
            .iter()
            .filter(|t| links.contains(&(post_id, t.id)))
            .cloned()
            .collect();
        attached.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attached)
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryStore {
    async fn upsert_by_title(&self, params: UpsertPostParams) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut posts = self.posts.lock().await;

        if let Some(existing) = posts.iter_mut().find(|p| p.title == params.title) {
            existing.slug = params.slug;
            existing.body = params.body;
            existing.toc = params.toc;
            existing.description = params.description;
            existing.source = params.source;
            existing.read_time = params.read_time;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            body: params.body,
            toc: params.toc,
            description: params.description,
            source: params.source,
            read_time: params.read_time,
            created_at: now,
            updated_at: now,
        };
        posts.push(record.clone());
        Ok(record)
    }

    async fn attach_topics(&self, post_id: Uuid, topic_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut links = self.links.lock().await;
        for topic_id in topic_ids {
            links.insert((post_id, *topic_id));
        }
        Ok(())
    }
}

#[async_trait]
impl TopicsRepo for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<TopicRecord>, RepoError> {
        Ok(self.topics.lock().await.clone())
    }

    async fn find_by_name_ci(&self, name: &str) -> Result<Option<TopicRecord>, RepoError> {
        let topics = self.topics.lock().await;
        Ok(topics
            .iter()
            .find(|t| t.name.to_lowercase() == name.to_lowercase())
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TopicRecord>, RepoError> {
        let topics = self.topics.lock().await;
        Ok(topics.iter().find(|t| t.name == name).cloned())
    }
}

#[async_trait]
impl TopicsWriteRepo for InMemoryStore {
    async fn create(&self, name: &str) -> Result<TopicRecord, RepoError> {
        let mut topics = self.topics.lock().await;
        if topics.iter().any(|t| t.name == name) {
            return Err(RepoError::Duplicate {
                constraint: "topics_name_key".to_string(),
            });
        }
        let record = TopicRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        topics.push(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.topics.lock().await.retain(|t| t.id != id);
        self.links.lock().await.retain(|(_, topic_id)| *topic_id != id);
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for InMemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub sessions: SessionCodec,
}

impl TestApp {
    pub fn session_cookie(&self) -> String {
        let token = self.sessions.issue(ALLOWED_USER).expect("issue session");
        format!("{}={token}", self.sessions.cookie_name())
    }
}

/// Github settings pointing nowhere; for suites that never exercise login.
pub fn offline_github_settings() -> GithubSettings {
    github_settings_for("127.0.0.1:9")
}

pub fn github_settings_for(addr: impl std::fmt::Display) -> GithubSettings {
    GithubSettings {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        allowed_user: ALLOWED_USER.to_string(),
        token_url: format!("http://{addr}/token"),
        user_url: format!("http://{addr}/user"),
        http_timeout: Duration::from_secs(2),
    }
}

pub fn build_app(github: GithubSettings) -> TestApp {
    let store = Arc::new(InMemoryStore::default());

    let posts: Arc<dyn PostsRepo> = store.clone();
    let posts_write: Arc<dyn PostsWriteRepo> = store.clone();
    let topics: Arc<dyn TopicsRepo> = store.clone();
    let topics_write: Arc<dyn TopicsWriteRepo> = store.clone();
    let health: Arc<dyn HealthProbe> = store.clone();

    let render = Arc::new(RenderService::new());
    let matcher: Arc<dyn TopicMatcher> = Arc::new(LexiconMatcher);

    let ingest = Arc::new(IngestService::new(
        render,
        posts_write.clone(),
        topics.clone(),
        matcher.clone(),
    ));
    let topic_service = Arc::new(TopicService::new(
        topics.clone(),
        topics_write,
        posts.clone(),
        posts_write,
        matcher,
    ));

    let sessions = SessionCodec::new(SESSION_SECRET, "token");
    let auth = Arc::new(AuthService::new(
        GithubClient::new(&github).expect("github client"),
        sessions.clone(),
        github.allowed_user.clone(),
    ));

    let sitemap = Arc::new(SitemapService::new(
        "http://blog.test",
        vec![
            Arc::new(StaticPagesProvider) as Arc<dyn SitemapProvider>,
            Arc::new(PostsProvider::new(posts.clone())),
        ],
    ));

    let state = AppState {
        posts,
        topics,
        ingest,
        topic_service,
        auth,
        sitemap,
        sessions: sessions.clone(),
        health,
        site_title: SITE_TITLE.to_string(),
    };

    TestApp {
        router: build_router(state),
        store,
        sessions,
    }
}

pub const MULTIPART_BOUNDARY: &str = "penna-test-boundary";

/// Hand-rolled multipart body carrying one file field.
pub fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"post_file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/markdown\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}
