// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Login endpoints
//!
//! POST /v1/auth/login, /v1/auth/signup and /v1/auth/logout.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{bearer_token, login_handler, logout_handler, signup_handler};
pub use request::CredentialsRequest;
pub use response::{LoginResponse, LogoutResponse};
