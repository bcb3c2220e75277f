use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::AuthVerifier;
use crate::canvas::{CanvasClient, CanvasConfig, CanvasError};
use crate::config::Config;
use crate::db::TimetableDb;
use crate::matcher::ClassmateMatcher;
use crate::secrets::{CredentialStore, TokenCipher};

/// Shared state handed to every request handler.
pub struct AppState {
    pub db: Arc<TimetableDb>,
    pub matcher: ClassmateMatcher,
    pub credentials: CredentialStore,
    pub canvas: CanvasClient,
    pub auth: AuthVerifier,
}

impl AppState {
    /// Opens the database and builds every client from `config`.
    ///
    /// The encryption key is validated here so a bad key fails startup, not the
    /// first request that needs it.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let db = Arc::new(
            TimetableDb::open(&config.database_path, config.db_busy_timeout)
                .with_context(|| format!("Failed to open database at {}", config.database_path))?,
        );
        info!("Opened database at {}", config.database_path);

        let cipher = TokenCipher::new(&config.fernet_key).context("FERNET_KEY is invalid")?;

        let canvas = CanvasClient::new(CanvasConfig {
            base_url: config.canvas_base.clone(),
            timeout: config.upstream_timeout,
        })
        .context("Failed to build Canvas client")?;

        let auth = AuthVerifier::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            config.upstream_timeout,
            config.auth_cache_ttl,
        )
        .context("Failed to build auth verifier")?;

        Ok(Self {
            matcher: ClassmateMatcher::new(db.clone()),
            credentials: CredentialStore::new(db.clone(), cipher),
            db,
            canvas,
            auth,
        })
    }

    /// Gets the user's decrypted Canvas token.
    pub fn canvas_token(&self, user_id: &str) -> Result<String, CanvasError> {
        self.credentials
            .get(user_id)?
            .ok_or(CanvasError::MissingToken)
    }
}

#[cfg(test)]
impl AppState {
    /// Builds a state backed by an in-memory database and the given upstream URLs.
    pub(crate) fn in_memory(canvas_base: &str, supabase_url: &str) -> Arc<Self> {
        Self::with_database(canvas_base, supabase_url, ":memory:")
    }

    /// Same as [`in_memory`](Self::in_memory) but backed by the database file at `database_path`.
    pub(crate) fn with_database(
        canvas_base: &str,
        supabase_url: &str,
        database_path: &str,
    ) -> Arc<Self> {
        let config = Config {
            bind_address: "127.0.0.1:0".to_string(),
            database_path: database_path.to_string(),
            canvas_base: canvas_base.to_string(),
            supabase_url: supabase_url.to_string(),
            supabase_anon_key: "anon-key".to_string(),
            fernet_key: fernet::Fernet::generate_key(),
            upstream_timeout: std::time::Duration::from_secs(5),
            db_busy_timeout: std::time::Duration::from_millis(100),
            auth_cache_ttl: std::time::Duration::from_secs(60),
        };
        Arc::new(Self::new(&config).unwrap())
    }
}
