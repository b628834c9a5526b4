//! The login gateway: OAuth code exchange, single-user allow-list, session
//! issuance.

use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::infra::github::{GithubClient, GithubError};
use crate::infra::session::{SessionCodec, SessionError};

#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider rejected the exchange or lookup; carries the
    /// provider-supplied description when one was given.
    #[error("{0}")]
    Upstream(String),
    #[error("User {username} is not a blogger.")]
    Forbidden { username: String },
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<GithubError> for AuthError {
    fn from(err: GithubError) -> Self {
        AuthError::Upstream(err.to_string())
    }
}

/// Exchanges an OAuth callback code for a signed session token, rejecting
/// every username except the configured one.
pub struct AuthService {
    github: GithubClient,
    sessions: SessionCodec,
    allowed_user: String,
}

impl AuthService {
    pub fn new(github: GithubClient, sessions: SessionCodec, allowed_user: String) -> Self {
        Self {
            github,
            sessions,
            allowed_user,
        }
    }

    /// Run the whole login flow for one callback code. Returns the signed
    /// session token to store in the cookie.
    pub async fn login(&self, code: &str) -> Result<String, AuthError> {
        let access_token = self.github.exchange_code(code).await?;
        let username = self.github.resolve_user(&access_token).await?;
        self.authorize(&username)?;

        let token = self.sessions.issue(&username)?;
        counter!("penna_logins_total").increment(1);
        info!(target = "penna::auth", username = %username, "login succeeded");
        Ok(token)
    }

    fn authorize(&self, username: &str) -> Result<(), AuthError> {
        if username.eq_ignore_ascii_case(&self.allowed_user) {
            Ok(())
        } else {
            warn!(target = "penna::auth", username = %username, "login rejected");
            Err(AuthError::Forbidden {
                username: username.to_string(),
            })
        }
    }
}
