//! Bearer token verification against the identity provider's user-info endpoint.

mod cache;
mod error;

use cache::{TokenCache, TokenKey};
pub use error::AuthError;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Path of the user-info endpoint, relative to the provider base URL.
const USER_PATH: &str = "/auth/v1/user";

/// The identity behind a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

pub struct AuthVerifier {
    client: Client,
    base_url: String,
    anon_key: String,
    cache: TokenCache,
}

impl AuthVerifier {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Upstream {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            cache: TokenCache::new(cache_ttl),
        })
    }

    /// Drops expired verifications from the cache.
    pub fn cleanup_cache(&self) {
        self.cache.cleanup_expired();
    }

    /// Resolves a bearer token to the user it belongs to.
    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let key = TokenKey::from_token(token);
        if let Some(user) = self.cache.get(&key) {
            debug!(token = %key, user_id = %user.id, "Using cached token verification");
            return Ok(user);
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, USER_PATH))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(
                token = %key,
                status = response.status().as_u16(),
                "Identity provider rejected token"
            );
            return Err(AuthError::InvalidToken {
                status: response.status().as_u16(),
            });
        }

        let user: AuthUser = response.json().await.map_err(|e| AuthError::Upstream {
            message: format!("Malformed user-info response: {}", e),
        })?;

        self.cache.insert(key, user.clone());
        Ok(user)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
