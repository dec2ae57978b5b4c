// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request/response bodies for the custodial wallet API, plus input
//! validation for email format and the password policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::FieldError;
use crate::storage::WalletInfo;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRequestBody {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResetRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    /// Lowest-priority session token transport.
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportKeyRequest {
    pub password: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageRequest {
    pub address: String,
    pub message: String,
    pub password: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub wallet_address: String,
    pub session_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub wallet_address: String,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionCheckResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_info: Option<WalletInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub address: String,
    pub expires_at: DateTime<Utc>,
}

/// Deliberately identical whether or not the email was registered.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenericRecoveryResponse {
    pub success: bool,
    pub message: String,
}

impl GenericRecoveryResponse {
    pub fn standard() -> Self {
        Self {
            success: true,
            message: "If the email exists, a recovery link has been sent".to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryVerifyResponse {
    pub valid: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportKeyResponse {
    /// 0x-prefixed hex of the raw 32-byte key.
    pub private_key: String,
    pub address: String,
    pub warning: String,
}

/// Fixed caution text returned with every key export.
pub const EXPORT_WARNING: &str = "Anyone with this private key has full control \
of the wallet. Store it offline and never share it.";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageResponse {
    pub address: String,
    pub signature: String,
}

// =============================================================================
// Validation
// =============================================================================

/// Minimal email shape check: one `@` with a dotted domain after it.
pub fn validate_email(email: &str) -> Option<FieldError> {
    let ok = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && domain.contains('.')
                    && !email.contains(char::is_whitespace)
            });
    if ok {
        None
    } else {
        Some(FieldError::new("email", "Invalid email address"))
    }
}

/// Password policy: at least 8 characters with an uppercase letter, a
/// lowercase letter, a digit, and a special character.
pub fn validate_password_policy(field: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if password.len() < 8 {
        errors.push(FieldError::new(
            field,
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(FieldError::new(
            field,
            "Password must contain an uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(FieldError::new(
            field,
            "Password must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(field, "Password must contain a digit"));
    }
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        errors.push(FieldError::new(
            field,
            "Password must contain a special character",
        ));
    }
    errors
}

/// Validate a registration (or credential-setting) pair.
pub fn validate_credentials(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(e) = validate_email(email) {
        errors.push(e);
    }
    errors.extend(validate_password_policy("password", password));
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_email() {
        assert!(validate_email("user@example.com").is_none());
        assert!(validate_email("a.b+c@mail.example.co").is_none());
    }

    #[test]
    fn rejects_malformed_email() {
        for email in ["", "plain", "no@dots", "@example.com", "a b@example.com", "a@.com"] {
            assert!(validate_email(email).is_some(), "accepted {email:?}");
        }
    }

    #[test]
    fn password_policy_requires_all_character_classes() {
        assert!(validate_password_policy("password", "Str0ng-pass").is_empty());

        assert!(!validate_password_policy("password", "Sh0rt-!").is_empty());
        assert!(!validate_password_policy("password", "all-lower-1!").is_empty());
        assert!(!validate_password_policy("password", "ALL-UPPER-1!").is_empty());
        assert!(!validate_password_policy("password", "No-Digits-Here!").is_empty());
        assert!(!validate_password_policy("password", "NoSpecial123").is_empty());
    }

    #[test]
    fn credential_validation_collects_all_failures() {
        let errors = validate_credentials("bad", "weak");
        assert!(errors.iter().any(|e| e.field == "email"));
        assert!(errors.iter().any(|e| e.field == "password"));
    }

    #[test]
    fn body_token_field_is_optional() {
        let request: ChangePasswordRequest = serde_json::from_str(
            r#"{"currentPassword":"a","newPassword":"b"}"#,
        )
        .unwrap();
        assert!(request.session_token.is_none());

        let request: ExportKeyRequest =
            serde_json::from_str(r#"{"password":"a","sessionToken":"tok"}"#).unwrap();
        assert_eq!(request.session_token.as_deref(), Some("tok"));
    }
}
