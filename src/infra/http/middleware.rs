use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::infra::session::Principal;

use super::AppState;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "penna::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "penna::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

/// The resolved session for one request: anonymous, or a verified principal.
#[derive(Clone, Default)]
pub struct SessionState {
    pub principal: Option<Principal>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

/// Decode the session cookie into a request principal. A missing or invalid
/// token leaves the request anonymous; the guard below decides access.
pub async fn authenticate_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let mut session = SessionState::default();

    if let Some(cookie) = jar.get(state.sessions.cookie_name()) {
        match state.sessions.verify(cookie.value()) {
            Ok(principal) => {
                session.principal = Some(principal);
            }
            Err(err) => {
                warn!(
                    target = "penna::http::session",
                    error = %err,
                    "session token rejected",
                );
            }
        }
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Guard for gated routes: without a resolved principal the request is
/// rejected uniformly.
pub async fn require_authenticated(request: Request<Body>, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<SessionState>()
        .is_some_and(SessionState::is_authenticated);

    if !authenticated {
        return HttpError::new(
            "infra::http::middleware::require_authenticated",
            StatusCode::UNAUTHORIZED,
            "Authentication required",
            "no valid session principal on request",
        )
        .into_response();
    }

    next.run(request).await
}
