//! HTTP surface: public pages, the login gateway, and gated management
//! actions, composed from explicit middleware stages.

mod auth;
mod manage;
pub mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::application::{
    auth::AuthService,
    ingest::IngestService,
    repos::{HealthProbe, PostsRepo, TopicsRepo},
    sitemap::SitemapService,
    topics::TopicService,
};
use crate::infra::session::SessionCodec;

use self::middleware::{
    authenticate_session, log_responses, require_authenticated, set_request_context,
};

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostsRepo>,
    pub topics: Arc<dyn TopicsRepo>,
    pub ingest: Arc<IngestService>,
    pub topic_service: Arc<TopicService>,
    pub auth: Arc<AuthService>,
    pub sitemap: Arc<SitemapService>,
    pub sessions: SessionCodec,
    pub health: Arc<dyn HealthProbe>,
    pub site_title: String,
}

pub fn build_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/upload_post", post(manage::upload_post))
        .route("/topics", post(manage::create_topic))
        .route("/topics/{name}/delete", post(manage::delete_topic))
        .route("/logout", get(auth::logout))
        .layer(from_fn(require_authenticated));

    Router::new()
        .route("/", get(public::index))
        .route("/posts/{slug}", get(public::post_detail))
        .route("/auth", get(auth::login))
        .route("/sitemap.xml", get(public::sitemap_xml))
        .route("/robots.txt", get(public::robots_txt))
        .route("/_health/db", get(public::db_health))
        .merge(gated)
        .fallback(public::not_found)
        .with_state(state.clone())
        .layer(from_fn_with_state(state, authenticate_session))
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}
