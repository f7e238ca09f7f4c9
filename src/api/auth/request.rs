// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Email and password, for both login and signup
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl CredentialsRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "email".to_string(),
                message: "email is required".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(ApiError::ValidationError {
                field: "password".to_string(),
                message: "password is required".to_string(),
            });
        }
        Ok(())
    }
}
