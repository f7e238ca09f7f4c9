// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service account credentials and OAuth2 access tokens
//!
//! The admin credentials file (`firebase_key.json`) is exchanged for a
//! short-lived access token using the JWT bearer grant. Tokens are cached
//! until shortly before they expire.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid service account key: {0}")]
    InvalidKey(String),
    #[error("Failed to sign assertion: {0}")]
    Signing(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Token request rejected: {0}")]
    Rejected(String),
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Contents of a service account key file
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, TokenError> {
        serde_json::from_str(json).map_err(|e| TokenError::InvalidKey(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TokenError::InvalidKey(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }
}

/// JWT claims of the bearer assertion
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(key: &ServiceAccountKey, issued_at: i64) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: TOKEN_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Sign an RS256 assertion for the token endpoint
pub fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, TokenError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| TokenError::InvalidKey(e.to_string()))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    jsonwebtoken::encode(&header, &AssertionClaims::new(key, issued_at), &encoding_key)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    valid_until: Instant,
}

/// Hands out access tokens for a service account, refreshing on demand
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Self {
        Self {
            key,
            client,
            cached: Mutex::new(None),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    /// A valid access token, fetching a new one if the cached token is stale
    pub async fn access_token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.valid_until {
                return Ok(token.value.clone());
            }
        }

        let assertion = sign_assertion(&self.key, Utc::now().timestamp())?;
        debug!("Requesting access token for {}", self.key.client_email);

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TokenError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Rejected(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Rejected(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(
            "🔑 Service account token acquired (valid {}s)",
            lifetime.as_secs()
        );

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            valid_until: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}
