use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::application::auth::AuthError;
use crate::application::error::HttpError;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    code: Option<String>,
}

/// OAuth callback: exchange the code, gate on the allow-list, set the session
/// cookie, and bounce to the index.
pub(super) async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
) -> Response {
    let Some(code) = query.code else {
        return HttpError::new(
            "infra::http::auth::login",
            StatusCode::BAD_REQUEST,
            "`code` parameter is required.",
            "login callback arrived without a code",
        )
        .into_response();
    };

    match state.auth.login(&code).await {
        Ok(token) => {
            let cookie = Cookie::build((state.sessions.cookie_name().to_string(), token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(err) => auth_error_response(err),
    }
}

/// Clear the session cookie. The route is behind the authentication guard.
pub(super) async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut cookie = Cookie::from(state.sessions.cookie_name().to_string());
    cookie.set_path("/");
    (jar.remove(cookie), Redirect::to("/")).into_response()
}

fn auth_error_response(err: AuthError) -> Response {
    match &err {
        AuthError::Upstream(message) => HttpError::new(
            "infra::http::auth::login",
            StatusCode::BAD_REQUEST,
            message.clone(),
            "identity provider rejected the login",
        )
        .into_response(),
        AuthError::Forbidden { .. } => HttpError::new(
            "infra::http::auth::login",
            StatusCode::BAD_REQUEST,
            err.to_string(),
            "authenticated user is not on the allow-list",
        )
        .into_response(),
        AuthError::Session(_) => HttpError::from_error(
            "infra::http::auth::login",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Login failed",
            &err,
        )
        .into_response(),
    }
}
