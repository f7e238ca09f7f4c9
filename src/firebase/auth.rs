// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Email/password authentication
//!
//! `FirebaseAuthProvider` talks to the Identity Toolkit REST API;
//! `MockAuthProvider` keeps users in memory for tests and local runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// Minimum password length enforced by the identity provider
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailExists,
    #[error("Weak password: {0}")]
    WeakPassword(String),
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error("Too many attempts, try again later")]
    TooManyAttempts,
    #[error("User account is disabled")]
    UserDisabled,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of `id_token` in seconds
    pub expires_in: u64,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
}

/// Client-side checks shared by all backends
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Map an Identity Toolkit error message (e.g. `WEAK_PASSWORD : Password
/// should be at least 6 characters`) to an `AuthError`
pub fn map_identity_error(message: &str) -> AuthError {
    let (code, detail) = match message.split_once(" : ") {
        Some((code, detail)) => (code.trim(), detail.trim().to_string()),
        None => (message.trim(), String::new()),
    };

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(detail),
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail(detail),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
        "USER_DISABLED" => AuthError::UserDisabled,
        "MISSING_PASSWORD" => AuthError::InvalidCredentials,
        other => AuthError::ServerError(other.to_string()),
    }
}

#[derive(Debug)]
struct MockUser {
    user_id: String,
    password_hash: String,
}

/// In-memory identity provider
#[derive(Debug, Clone, Default)]
pub struct MockAuthProvider {
    users: Arc<RwLock<HashMap<String, MockUser>>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_password(email: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email.as_bytes());
        hasher.update([0u8]);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn issue_session(email: &str, user_id: &str) -> AuthSession {
        AuthSession {
            user_id: user_id.to_string(),
            email: email.to_string(),
            id_token: format!("mock-id-token-{}", uuid::Uuid::new_v4().simple()),
            refresh_token: Some(format!("mock-refresh-{}", uuid::Uuid::new_v4().simple())),
            expires_in: 3600,
        }
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        validate_email(email)?;
        let email = email.trim().to_lowercase();

        let users = self.users.read().await;
        let user = users.get(&email).ok_or(AuthError::InvalidCredentials)?;

        if user.password_hash != Self::hash_password(&email, password) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Self::issue_session(&email, &user.user_id))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        validate_email(email)?;
        validate_new_password(password)?;
        let email = email.trim().to_lowercase();

        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err(AuthError::EmailExists);
        }

        let user_id = uuid::Uuid::new_v4().simple().to_string();
        users.insert(
            email.clone(),
            MockUser {
                user_id: user_id.clone(),
                password_hash: Self::hash_password(&email, password),
            },
        );

        Ok(Self::issue_session(&email, &user_id))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    /// Seconds, sent as a string
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: IdentityError,
}

#[derive(Debug, Deserialize)]
struct IdentityError {
    message: String,
}

/// Identity Toolkit backed provider
#[derive(Debug, Clone)]
pub struct FirebaseAuthProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FirebaseAuthProvider {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
        }
    }

    /// Point at a different endpoint (auth emulator)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.base_url, action, self.api_key)
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let email = email.trim();
        let response = self
            .client
            .post(self.endpoint(action))
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: Result<IdentityErrorBody, _> = response.json().await;
            return Err(match body {
                Ok(body) => {
                    debug!("Identity toolkit {} rejected: {}", action, body.error.message);
                    map_identity_error(&body.error.message)
                }
                Err(_) => AuthError::ServerError(format!("{} failed: {}", action, status)),
            });
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ServerError(e.to_string()))?;

        let expires_in = match body.expires_in.as_deref().map(str::parse::<u64>) {
            Some(Ok(secs)) => secs,
            Some(Err(_)) => {
                warn!("Unparseable expiresIn from identity toolkit, assuming 3600s");
                3600
            }
            None => 3600,
        };

        Ok(AuthSession {
            user_id: body.local_id,
            email: body.email.unwrap_or_else(|| email.to_string()),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in,
        })
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        validate_email(email)?;
        validate_new_password(password)?;
        self.password_call("signUp", email, password).await
    }
}
