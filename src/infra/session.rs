//! Signed session tokens.
//!
//! A session is an HS256 JWT carrying only the username. The algorithm is
//! pinned at decode and no expiry claim is enforced: validity is bound
//! solely to signature correctness.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session token invalid: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    username: String,
}

/// The authenticated identity attached to a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
}

#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    cookie_name: String,
}

impl SessionCodec {
    pub fn new(secret: &str, cookie_name: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            cookie_name: cookie_name.to_string(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue(&self, username: &str) -> Result<String, SessionError> {
        let claims = Claims {
            username: username.to_string(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Principal, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(Principal {
            username: data.claims.username,
        })
    }
}
