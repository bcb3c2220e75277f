//! TTL-based caching for verified bearer tokens.

use super::AuthUser;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// A cache key derived from a bearer token.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct TokenKey(String);

impl TokenKey {
    /// Creates a key from a raw bearer token.
    ///
    /// The token is hashed so it is never held in memory longer than the request.
    pub fn from_token(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

#[derive(Clone)]
struct CachedUser {
    user: AuthUser,
    cached_at: Instant,
}

/// Thread-safe cache of recently verified users.
pub struct TokenCache {
    entries: DashMap<TokenKey, CachedUser>,
    ttl: Duration,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Gets a cached user if the entry hasn't expired.
    pub fn get(&self, key: &TokenKey) -> Option<AuthUser> {
        self.entries.get(key).and_then(|entry| {
            if entry.cached_at.elapsed() < self.ttl {
                Some(entry.user.clone())
            } else {
                drop(entry);
                self.entries.remove(key);
                None
            }
        })
    }

    pub fn insert(&self, key: TokenKey, user: AuthUser) {
        // A zero TTL disables caching
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CachedUser {
                user,
                cached_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub fn invalidate(&self, key: &TokenKey) {
        self.entries.remove(key);
    }

    /// Removes expired entries.
    pub fn cleanup_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.cached_at.elapsed() < ttl);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
