// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors raised by the session extractors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::WalletError;

/// Authentication error type.
#[derive(Debug)]
pub enum AuthError {
    /// No session token in any transport.
    NoSession,
    /// A token was presented but does not resolve to a live session.
    InvalidSession,
    /// The session is live but bound to a different address.
    AddressMismatch {
        /// Lowercased address from the request path.
        requested: String,
        /// Lowercased address the session is bound to.
        session: String,
    },
    /// Storage failure while resolving the session.
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    code: String,
    #[serde(rename = "requestedAddress", skip_serializing_if = "Option::is_none")]
    requested_address: Option<String>,
    #[serde(rename = "sessionAddress", skip_serializing_if = "Option::is_none")]
    session_address: Option<String>,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NoSession => "NO_SESSION",
            AuthError::InvalidSession => "INVALID_SESSION",
            AuthError::AddressMismatch { .. } => "ADDRESS_MISMATCH",
            AuthError::Internal(_) => "STORAGE_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NoSession | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::AddressMismatch { .. } => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NoSession => write!(f, "No session token provided"),
            AuthError::InvalidSession => write!(f, "Session is invalid or has expired"),
            AuthError::AddressMismatch { .. } => {
                write!(f, "The address does not match the session")
            }
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for WalletError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NoSession => WalletError::AuthRequired,
            AuthError::InvalidSession => WalletError::InvalidSession,
            AuthError::AddressMismatch { .. } => WalletError::Forbidden,
            AuthError::Internal(msg) => WalletError::Storage(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "auth resolution failure");
        }
        let (requested_address, session_address) = match &self {
            AuthError::AddressMismatch { requested, session } => {
                (Some(requested.clone()), Some(session.clone()))
            }
            _ => (None, None),
        };
        // Internal detail stays out of the body
        let message = match &self {
            AuthError::Internal(_) => "Internal authentication error".to_string(),
            other => other.to_string(),
        };
        let body = Json(AuthErrorBody {
            error: message,
            code: self.error_code().to_string(),
            requested_address,
            session_address,
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn no_session_returns_401() {
        let response = AuthError::NoSession.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["code"], "NO_SESSION");
    }

    #[tokio::test]
    async fn address_mismatch_returns_403_with_both_addresses() {
        let response = AuthError::AddressMismatch {
            requested: "0xaaa".to_string(),
            session: "0xbbb".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["code"], "ADDRESS_MISMATCH");
        assert_eq!(body["requestedAddress"], "0xaaa");
        assert_eq!(body["sessionAddress"], "0xbbb");
    }

    #[tokio::test]
    async fn internal_error_body_is_generic() {
        let response = AuthError::Internal("redb: io".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Internal authentication error");
    }
}
