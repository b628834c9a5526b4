use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::domain::entities::{PostRecord, TopicRecord};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    source_site: &'static str,
    public_message: &'static str,
    #[source]
    error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        HttpError::from_error(
            err.source_site,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.public_message,
            &err,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError {
            source_site: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error: err,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(site_title: &str) -> Response {
    let template = NotFoundTemplate {
        site_title: site_title.to_string(),
    };
    let mut response = render_template_response(template, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct PostSummaryView {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub read_time: String,
    pub published: String,
    pub topics: Vec<String>,
}

impl PostSummaryView {
    pub fn from_record(post: &PostRecord, topics: &[TopicRecord]) -> Self {
        Self {
            title: post.title.clone(),
            slug: post.slug.clone(),
            description: post.description.clone(),
            read_time: post.read_time.clone(),
            published: format_date(post.created_at),
            topics: topics.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub site_title: String,
    pub posts: Vec<PostSummaryView>,
    pub topics: Vec<String>,
    pub authenticated: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub site_title: String,
    pub title: String,
    pub body: String,
    pub toc: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub read_time: String,
    pub published: String,
    pub updated: String,
    pub topics: Vec<String>,
}

impl PostTemplate {
    pub fn from_record(site_title: &str, post: PostRecord, topics: &[TopicRecord]) -> Self {
        Self {
            site_title: site_title.to_string(),
            title: post.title,
            body: post.body,
            toc: post.toc,
            source: post.source,
            description: post.description,
            read_time: post.read_time,
            published: format_date(post.created_at),
            updated: format_date(post.updated_at),
            topics: topics.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {
    pub site_title: String,
}

pub fn format_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}
