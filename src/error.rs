// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the custodial wallet service.
//!
//! Security-sensitive failures (wrong password, bad token, bad session) use
//! fixed generic messages so callers cannot enumerate accounts or distinguish
//! which factor was wrong. Validation failures carry field-level detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::keys::KeyError;
use crate::storage::DbError;
use crate::vault::VaultError;

/// A single field validation failure.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Service error type.
///
/// Every variant maps to a stable machine-readable `error_code` and an HTTP
/// status. The `Display` strings are the caller-facing messages; variants
/// covering authentication and recovery deliberately say nothing about which
/// check failed.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Malformed input (bad email format, weak password).
    #[error("Invalid request data")]
    Validation(Vec<FieldError>),

    /// Registration conflict: email already bound to a wallet.
    #[error("This email is already registered with another wallet")]
    DuplicateEmail,

    /// Registration conflict: address already bound to a wallet.
    #[error("This address is already registered with another wallet")]
    DuplicateAddress,

    /// Login failure. Does not distinguish unknown email from wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No session token presented where one is mandatory.
    #[error("No session token provided")]
    AuthRequired,

    /// Session token present but unresolvable or expired.
    #[error("Session is invalid or has expired")]
    InvalidSession,

    /// Session resolves to a different identity than requested.
    #[error("The address does not match the session")]
    Forbidden,

    /// Recovery token invalid, expired, or already used.
    #[error("Recovery token is invalid or has expired")]
    InvalidRecoveryToken,

    /// Password re-authentication failure (login, export, change-password).
    #[error("Incorrect password")]
    InvalidPassword,

    /// Wallet lookup failure on an authenticated path.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Underlying crypto primitive failure. Never carries secret material.
    #[error("Internal cryptography error")]
    Crypto(String),

    /// Underlying storage failure. Never carries secret material.
    #[error("Internal storage error")]
    Storage(String),
}

/// JSON body for error responses.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Caller-facing message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: String,
    /// Field-level detail, present for validation errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl WalletError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            WalletError::Validation(_) => "VALIDATION_ERROR",
            WalletError::DuplicateEmail => "EMAIL_ALREADY_REGISTERED",
            WalletError::DuplicateAddress => "ADDRESS_ALREADY_REGISTERED",
            WalletError::InvalidCredentials => "INVALID_CREDENTIALS",
            WalletError::AuthRequired => "NO_SESSION",
            WalletError::InvalidSession => "INVALID_SESSION",
            WalletError::Forbidden => "ADDRESS_MISMATCH",
            WalletError::InvalidRecoveryToken => "INVALID_TOKEN",
            WalletError::InvalidPassword => "INVALID_PASSWORD",
            WalletError::WalletNotFound => "WALLET_NOT_FOUND",
            WalletError::Crypto(_) => "CRYPTO_ERROR",
            WalletError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WalletError::Validation(_) | WalletError::InvalidRecoveryToken => {
                StatusCode::BAD_REQUEST
            }
            WalletError::DuplicateEmail | WalletError::DuplicateAddress => StatusCode::CONFLICT,
            WalletError::InvalidCredentials
            | WalletError::AuthRequired
            | WalletError::InvalidSession
            | WalletError::InvalidPassword => StatusCode::UNAUTHORIZED,
            WalletError::Forbidden => StatusCode::FORBIDDEN,
            WalletError::WalletNotFound => StatusCode::NOT_FOUND,
            WalletError::Crypto(_) | WalletError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DbError> for WalletError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateEmail => WalletError::DuplicateEmail,
            DbError::DuplicateAddress => WalletError::DuplicateAddress,
            DbError::RecoveryTokenInvalid => WalletError::InvalidRecoveryToken,
            DbError::WalletNotFound(_) => WalletError::WalletNotFound,
            other => WalletError::Storage(other.to_string()),
        }
    }
}

impl From<VaultError> for WalletError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::InvalidPassword => WalletError::InvalidPassword,
            other => WalletError::Crypto(other.to_string()),
        }
    }
}

impl From<KeyError> for WalletError {
    fn from(e: KeyError) -> Self {
        WalletError::Crypto(e.to_string())
    }
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 5xx causes are logged server-side; the response body stays generic.
        if status.is_server_error() {
            let detail = match &self {
                WalletError::Crypto(msg) | WalletError::Storage(msg) => msg.as_str(),
                _ => "",
            };
            tracing::error!(code = self.error_code(), detail, "internal error");
        }

        let details = match self {
            WalletError::Validation(ref fields) => Some(fields.clone()),
            _ => None,
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
            code: self.error_code().to_string(),
            details,
        });
        (status, body).into_response()
    }
}
