//! Encryption at rest for per-user LMS access tokens.

use crate::db::TimetableDb;
use fernet::Fernet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SecretError {
    /// The configured key is not a 32-byte URL-safe base64 Fernet key
    #[error("Invalid encryption key")]
    InvalidKey,

    /// The stored token was written with another key or has been tampered with
    #[error("Stored token could not be decrypted")]
    Decrypt,

    #[error("Secret store error: {message}")]
    Storage { message: String },
}

impl From<rusqlite::Error> for SecretError {
    fn from(err: rusqlite::Error) -> Self {
        SecretError::Storage {
            message: err.to_string(),
        }
    }
}

/// Symmetric cipher for tokens, loaded once at startup.
pub struct TokenCipher {
    fernet: Fernet,
}

impl TokenCipher {
    pub fn new(key: &str) -> Result<Self, SecretError> {
        let fernet = Fernet::new(key.trim()).ok_or(SecretError::InvalidKey)?;
        Ok(Self { fernet })
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        self.fernet.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt(&self, token: &str) -> Result<String, SecretError> {
        let bytes = self
            .fernet
            .decrypt(token)
            .map_err(|_| SecretError::Decrypt)?;
        String::from_utf8(bytes).map_err(|_| SecretError::Decrypt)
    }
}

/// Per-user store of encrypted LMS tokens.
pub struct CredentialStore {
    db: Arc<TimetableDb>,
    cipher: TokenCipher,
}

impl CredentialStore {
    pub fn new(db: Arc<TimetableDb>, cipher: TokenCipher) -> Self {
        Self { db, cipher }
    }

    /// Encrypts and stores `token`, replacing any token already held for the user.
    pub fn put(&self, user_id: &str, token: &str) -> Result<(), SecretError> {
        let encrypted = self.cipher.encrypt(token);
        self.db.put_secret(user_id, &encrypted)?;
        Ok(())
    }

    /// Returns the decrypted token for the user, if one was stored.
    pub fn get(&self, user_id: &str) -> Result<Option<String>, SecretError> {
        match self.db.get_secret(user_id)? {
            Some(encrypted) => self.cipher.decrypt(&encrypted).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        let db = Arc::new(TimetableDb::open_in_memory().unwrap());
        let cipher = TokenCipher::new(&Fernet::generate_key()).unwrap();
        CredentialStore::new(db, cipher)
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert_eq!(
            TokenCipher::new("not-a-key").err(),
            Some(SecretError::InvalidKey)
        );
    }

    #[test]
    fn test_token_is_not_stored_in_plaintext() {
        let db = Arc::new(TimetableDb::open_in_memory().unwrap());
        let cipher = TokenCipher::new(&Fernet::generate_key()).unwrap();
        let store = CredentialStore::new(db.clone(), cipher);

        store.put("u1", "canvas-token-123").unwrap();

        let raw = db.get_secret("u1").unwrap().unwrap();
        assert!(!raw.contains("canvas-token-123"));
        assert_eq!(store.get("u1").unwrap().as_deref(), Some("canvas-token-123"));
    }

    #[test]
    fn test_missing_token_is_none() {
        assert_eq!(store().get("nobody").unwrap(), None);
    }

    #[test]
    fn test_other_key_cannot_decrypt() {
        let db = Arc::new(TimetableDb::open_in_memory().unwrap());
        let writer = CredentialStore::new(
            db.clone(),
            TokenCipher::new(&Fernet::generate_key()).unwrap(),
        );
        writer.put("u1", "secret").unwrap();

        let reader = CredentialStore::new(db, TokenCipher::new(&Fernet::generate_key()).unwrap());
        assert_eq!(reader.get("u1").unwrap_err(), SecretError::Decrypt);
    }
}
