//! Sitemap generation from a statically registered provider list.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::application::repos::{PostsRepo, RepoError};

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SitemapEntry {
    pub path: String,
    pub lastmod: Option<OffsetDateTime>,
}

/// One source of sitemap entries. Providers are enumerated at startup; there
/// is no runtime discovery.
#[async_trait]
pub trait SitemapProvider: Send + Sync {
    async fn entries(&self) -> Result<Vec<SitemapEntry>, SitemapError>;
}

/// The fixed, handler-backed pages of the site.
pub struct StaticPagesProvider;

#[async_trait]
impl SitemapProvider for StaticPagesProvider {
    async fn entries(&self) -> Result<Vec<SitemapEntry>, SitemapError> {
        Ok(vec![SitemapEntry {
            path: "/".to_string(),
            lastmod: None,
        }])
    }
}

/// One entry per stored post, stamped with its last update.
pub struct PostsProvider {
    posts: Arc<dyn PostsRepo>,
}

impl PostsProvider {
    pub fn new(posts: Arc<dyn PostsRepo>) -> Self {
        Self { posts }
    }
}

#[async_trait]
impl SitemapProvider for PostsProvider {
    async fn entries(&self) -> Result<Vec<SitemapEntry>, SitemapError> {
        let posts = self.posts.list_all().await?;
        Ok(posts
            .into_iter()
            .map(|post| SitemapEntry {
                path: format!("/posts/{}", post.slug),
                lastmod: Some(post.updated_at),
            })
            .collect())
    }
}

pub struct SitemapService {
    public_url: String,
    providers: Vec<Arc<dyn SitemapProvider>>,
}

impl SitemapService {
    pub fn new(public_url: &str, providers: Vec<Arc<dyn SitemapProvider>>) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            providers,
        }
    }

    pub async fn sitemap_xml(&self) -> Result<String, SitemapError> {
        let mut body = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );

        for provider in &self.providers {
            for entry in provider.entries().await? {
                body.push_str(&render_entry(&self.public_url, &entry));
            }
        }

        body.push_str("</urlset>\n");
        Ok(body)
    }

    pub fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n",
            self.public_url
        )
    }
}

fn render_entry(base: &str, entry: &SitemapEntry) -> String {
    let lastmod = entry
        .lastmod
        .and_then(|at| at.format(&Rfc3339).ok())
        .map(|stamp| format!("<lastmod>{stamp}</lastmod>"))
        .unwrap_or_default();

    format!(
        "  <url><loc>{base}{path}</loc>{lastmod}</url>\n",
        path = entry.path,
    )
}
