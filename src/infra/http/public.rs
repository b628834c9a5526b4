use axum::{
    Extension,
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::application::error::HttpError;
use crate::application::repos::RepoError;
use crate::presentation::views::{
    IndexTemplate, PostSummaryView, PostTemplate, render_not_found_response,
    render_template_response,
};

use super::AppState;
use super::middleware::SessionState;

pub(super) async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<SessionState>,
) -> Response {
    let posts = match state.posts.list_all().await {
        Ok(posts) => posts,
        Err(err) => return repo_error_response("infra::http::public::index", err),
    };

    let mut summaries = Vec::with_capacity(posts.len());
    for post in &posts {
        let topics = match state.posts.topics_for(post.id).await {
            Ok(topics) => topics,
            Err(err) => return repo_error_response("infra::http::public::index", err),
        };
        summaries.push(PostSummaryView::from_record(post, &topics));
    }

    let topics = match state.topics.list_all().await {
        Ok(topics) => topics.into_iter().map(|t| t.name).collect(),
        Err(err) => return repo_error_response("infra::http::public::index", err),
    };

    render_template_response(
        IndexTemplate {
            site_title: state.site_title.clone(),
            posts: summaries,
            topics,
            authenticated: session.is_authenticated(),
        },
        StatusCode::OK,
    )
}

pub(super) async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let post = match state.posts.find_by_slug(&slug).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(&state.site_title),
        Err(err) => return repo_error_response("infra::http::public::post_detail", err),
    };

    let topics = match state.posts.topics_for(post.id).await {
        Ok(topics) => topics,
        Err(err) => return repo_error_response("infra::http::public::post_detail", err),
    };

    render_template_response(
        PostTemplate::from_record(&state.site_title, post, &topics),
        StatusCode::OK,
    )
}

pub(super) async fn sitemap_xml(State(state): State<AppState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(xml) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/xml; charset=utf-8")],
            xml,
        )
            .into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::public::sitemap_xml",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sitemap generation failed",
            &err,
        )
        .into_response(),
    }
}

pub(super) async fn robots_txt(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.sitemap.robots_txt(),
    )
        .into_response()
}

pub(super) async fn db_health(State(state): State<AppState>) -> Response {
    match state.health.ping().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::public::db_health",
            StatusCode::SERVICE_UNAVAILABLE,
            "database unavailable",
            &err,
        )
        .into_response(),
    }
}

pub(super) async fn not_found(State(state): State<AppState>) -> Response {
    render_not_found_response(&state.site_title)
}

fn repo_error_response(source: &'static str, err: RepoError) -> Response {
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        &err,
    )
    .into_response()
}
