use std::{process, sync::Arc};

use penna::{
    application::{
        auth::AuthService,
        error::AppError,
        ingest::IngestService,
        render::RenderService,
        repos::{HealthProbe, PostsRepo, PostsWriteRepo, TopicsRepo, TopicsWriteRepo},
        sitemap::{PostsProvider, SitemapProvider, SitemapService, StaticPagesProvider},
        tagging::{LexiconMatcher, TopicMatcher},
        topics::TopicService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        github::GithubClient,
        http::{self, AppState},
        session::SessionCodec,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::config(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;
    run_serve(settings).await
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = PostgresRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    repositories
        .migrate()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let state = build_state(repositories, &settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "penna::server",
        addr = %settings.server.addr,
        "listening",
    );

    let grace = settings.server.graceful_shutdown;
    let shutdown = async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!(target = "penna::server", "shutdown signal received");
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            warn!(
                target = "penna::server",
                "graceful shutdown grace period elapsed, forcing exit",
            );
            process::exit(1);
        });
    };

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

fn build_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<AppState, AppError> {
    let posts: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write: Arc<dyn PostsWriteRepo> = repositories.clone();
    let topics: Arc<dyn TopicsRepo> = repositories.clone();
    let topics_write: Arc<dyn TopicsWriteRepo> = repositories.clone();
    let health: Arc<dyn HealthProbe> = repositories;

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

    let github = GithubClient::new(&settings.github)
        .map_err(|err| AppError::unexpected(format!("failed to build OAuth client: {err}")))?;
    let sessions = SessionCodec::new(&settings.session.secret, &settings.session.cookie_name);
    let auth = Arc::new(AuthService::new(
        github,
        sessions.clone(),
        settings.github.allowed_user.clone(),
    ));

    let sitemap = Arc::new(SitemapService::new(
        &settings.site.public_url,
        vec![
            Arc::new(StaticPagesProvider) as Arc<dyn SitemapProvider>,
            Arc::new(PostsProvider::new(posts.clone())),
        ],
    ));

    Ok(AppState {
        posts,
        topics,
        ingest,
        topic_service,
        auth,
        sitemap,
        sessions,
        health,
        site_title: settings.site.title.clone(),
    })
}
