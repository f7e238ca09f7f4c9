// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server-side login sessions
//!
//! A successful login is stored under an opaque bearer token. The stored
//! `AuthSession` carries the user's ID token for storage and database calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::firebase::AuthSession;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    pub ttl_seconds: u64,
    pub max_sessions: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_sessions: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    auth: AuthSession,
    expires_at: Instant,
}

impl StoredSession {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    config: SessionStoreConfig,
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(SessionStoreConfig {
            ttl_seconds: ttl.as_secs(),
            ..Default::default()
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    /// Lifetime of a session for `auth`
    ///
    /// Never longer than the provider's ID token, which the session forwards
    /// to storage and database calls.
    pub fn ttl_for(&self, auth: &AuthSession) -> Duration {
        self.ttl().min(Duration::from_secs(auth.expires_in))
    }

    /// Store `auth` and return its bearer token
    ///
    /// When the store is full, expired sessions are dropped first, then the
    /// session closest to expiry.
    pub async fn create(&self, auth: AuthSession) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = Instant::now() + self.ttl_for(&auth);
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.config.max_sessions {
            sessions.retain(|_, s| !s.is_expired());
        }
        while sessions.len() >= self.config.max_sessions.max(1) {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.expires_at)
                .map(|(token, _)| token.clone());
            match oldest {
                Some(oldest) => {
                    debug!("Session store full, evicting oldest session");
                    sessions.remove(&oldest);
                }
                None => break,
            }
        }

        debug!("Session created for {}", auth.email);
        sessions.insert(token.clone(), StoredSession { auth, expires_at });
        token
    }

    /// The live session for `token`; expired entries are dropped
    pub async fn get(&self, token: &str) -> Option<AuthSession> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(s) if !s.is_expired() => return Some(s.auth.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(token);
        None
    }

    /// Log out; returns whether the token was known
    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}
