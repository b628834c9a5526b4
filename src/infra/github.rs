//! GitHub OAuth client: code exchange and user resolution.
//!
//! Calls carry a bounded timeout and a single retry on transport failure so
//! a hung upstream cannot stall a login indefinitely.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::GithubSettings;

#[derive(Debug, Error)]
pub enum GithubError {
    /// The provider answered but did not grant what was asked; carries the
    /// provider's own description when present.
    #[error("{message}")]
    Rejected { message: String },
    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct GithubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    user_url: String,
}

impl GithubClient {
    pub fn new(settings: &GithubSettings) -> Result<Self, GithubError> {
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .connect_timeout(settings.http_timeout)
            .user_agent(concat!("penna/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            token_url: settings.token_url.clone(),
            user_url: settings.user_url.clone(),
        })
    }

    /// Exchange an OAuth callback code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let request = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .header(ACCEPT, "application/json");

        let body: Value = send_with_retry(request).await?.json().await?;
        match body.get("access_token").and_then(Value::as_str) {
            Some(token) => Ok(token.to_string()),
            None => {
                debug!(target = "penna::github", body = %body, "token exchange failed");
                Err(GithubError::Rejected {
                    message: error_description(&body),
                })
            }
        }
    }

    /// Resolve the authenticated username behind an access token.
    pub async fn resolve_user(&self, access_token: &str) -> Result<String, GithubError> {
        let request = self
            .http
            .get(&self.user_url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(ACCEPT, "application/json");

        let body: Value = send_with_retry(request).await?.json().await?;
        match body.get("login").and_then(Value::as_str) {
            Some(login) => Ok(login.to_string()),
            None => {
                debug!(target = "penna::github", body = %body, "user lookup failed");
                Err(GithubError::Rejected {
                    message: error_description(&body),
                })
            }
        }
    }
}

async fn send_with_retry(request: reqwest::RequestBuilder) -> Result<reqwest::Response, GithubError> {
    let retry = request.try_clone();
    match request.send().await {
        Ok(response) => Ok(response),
        Err(first) => match retry {
            Some(retry) => {
                debug!(target = "penna::github", error = %first, "retrying upstream call");
                Ok(retry.send().await?)
            }
            None => Err(first.into()),
        },
    }
}

fn error_description(body: &Value) -> String {
    body.get("error_description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "identity provider did not grant access".to_string())
}
