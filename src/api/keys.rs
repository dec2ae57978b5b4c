// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential-sensitive endpoints: change password, export private key,
//! sign message.
//!
//! All three require a live session AND the wallet password; the session
//! alone never unlocks key material. These handlers accept the session token
//! from any transport, including the request body.

use axum::{
    extract::State,
    http::request::Parts,
    Json,
};
use serde_json::json;

use crate::auth::{authenticate, extract_from_parts, merge_body_token, AuthenticatedWallet};
use crate::email::password_changed_email;
use crate::error::WalletError;
use crate::keys;
use crate::models::{
    validate_password_policy, ChangePasswordRequest, ChangePasswordResponse, ExportKeyRequest,
    ExportKeyResponse, SignMessageRequest, SignMessageResponse, EXPORT_WARNING,
};
use crate::state::AppState;
use crate::storage::{AuditEvent, AuditEventType, WalletRecord};

/// Resolve the session for a body-carrying handler and load its wallet.
fn session_wallet(
    state: &AppState,
    parts: &Parts,
    body_token: Option<&str>,
    target_address: Option<&str>,
) -> Result<(AuthenticatedWallet, WalletRecord), WalletError> {
    let candidate = merge_body_token(extract_from_parts(parts), body_token);
    let wallet = authenticate(state, candidate.as_ref(), target_address)?;
    let record = state
        .db()
        .get_wallet(wallet.wallet_id)?
        .ok_or(WalletError::WalletNotFound)?;
    Ok((wallet, record))
}

/// Decrypt the stored private key with the given password.
///
/// Runs the KDF and AEAD work on the blocking pool.
async fn unlock_private_key(
    state: &AppState,
    record: &WalletRecord,
    password: &str,
) -> Result<Vec<u8>, WalletError> {
    let vault = state.vault_handle();
    let password = password.to_string();
    let ciphertext = record.encrypted_private_key.clone();
    let iv = record.encryption_iv.clone();
    let kdf_salt = record.kdf_salt.clone();
    let hash = record.password_hash.clone();
    let salt = record.password_salt.clone();
    tokio::task::spawn_blocking(move || {
        vault.decrypt_private_key(&password, &ciphertext, &iv, &kdf_salt, &hash, &salt)
    })
    .await
    .map_err(|e| WalletError::Crypto(e.to_string()))?
    .map_err(WalletError::from)
}

/// Change the wallet password.
///
/// Verifies the current password by decrypting the key, then re-encrypts it
/// under the new password so the ciphertext stays reachable.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/change-password",
    tag = "Keys",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ChangePasswordResponse),
        (status = 400, description = "Weak new password"),
        (status = 401, description = "No session, invalid session, or wrong current password")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    parts: Parts,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, WalletError> {
    let errors = validate_password_policy("newPassword", &request.new_password);
    if !errors.is_empty() {
        return Err(WalletError::Validation(errors));
    }

    let (wallet, record) =
        session_wallet(&state, &parts, request.session_token.as_deref(), None)?;

    let private_key = unlock_private_key(&state, &record, &request.current_password).await?;

    let vault = state.vault_handle();
    let new_password = request.new_password.clone();
    let material = tokio::task::spawn_blocking(move || {
        vault.encrypt_private_key(&private_key, &new_password)
    })
    .await
    .map_err(|e| WalletError::Crypto(e.to_string()))?
    .map_err(WalletError::from)?;

    state.db().update_password_material(
        record.wallet_id,
        &material.password_hash,
        &material.password_salt,
        Some((&material.ciphertext, &material.iv, &material.kdf_salt)),
    )?;

    let _ = state.db().append_audit(
        &AuditEvent::new(AuditEventType::PasswordChanged)
            .with_wallet(record.wallet_id.to_string())
            .with_address(&wallet.address),
    );

    // Notification is best-effort
    if let Err(e) = state.mailer().send(&password_changed_email(&record.email)) {
        tracing::warn!(error = %e, "password-change notification failed");
    }

    tracing::info!(wallet_id = %record.wallet_id, "password changed");

    Ok(Json(ChangePasswordResponse {
        success: true,
        message: "Password changed".to_string(),
    }))
}

/// Export the decrypted private key.
///
/// Requires a live session and the wallet password. The export is audited
/// without key material.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/export-private-key",
    tag = "Keys",
    request_body = ExportKeyRequest,
    responses(
        (status = 200, description = "Decrypted key", body = ExportKeyResponse),
        (status = 401, description = "No session, invalid session, or wrong password")
    )
)]
pub async fn export_private_key(
    State(state): State<AppState>,
    parts: Parts,
    Json(request): Json<ExportKeyRequest>,
) -> Result<Json<ExportKeyResponse>, WalletError> {
    let (wallet, record) =
        session_wallet(&state, &parts, request.session_token.as_deref(), None)?;

    let private_key = unlock_private_key(&state, &record, &request.password).await?;

    let _ = state.db().append_audit(
        &AuditEvent::new(AuditEventType::PrivateKeyExported)
            .with_wallet(record.wallet_id.to_string())
            .with_address(&wallet.address),
    );

    tracing::info!(wallet_id = %record.wallet_id, "private key exported");

    Ok(Json(ExportKeyResponse {
        private_key: keys::export_format(&private_key),
        address: record.address,
        warning: EXPORT_WARNING.to_string(),
    }))
}

/// Produce an EIP-191 personal-message signature with the wallet's key.
///
/// The session must be bound to the address in the body, and the password is
/// required to decrypt the key.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/sign-message",
    tag = "Keys",
    request_body = SignMessageRequest,
    responses(
        (status = 200, description = "Signature", body = SignMessageResponse),
        (status = 401, description = "No session, invalid session, or wrong password"),
        (status = 403, description = "Session bound to a different address")
    )
)]
pub async fn sign_message(
    State(state): State<AppState>,
    parts: Parts,
    Json(request): Json<SignMessageRequest>,
) -> Result<Json<SignMessageResponse>, WalletError> {
    let (wallet, record) = session_wallet(
        &state,
        &parts,
        request.session_token.as_deref(),
        Some(&request.address),
    )?;

    let private_key = unlock_private_key(&state, &record, &request.password).await?;
    let signature = keys::sign_personal_message(&private_key, &request.message)?;

    let _ = state.db().append_audit(
        &AuditEvent::new(AuditEventType::MessageSigned)
            .with_wallet(record.wallet_id.to_string())
            .with_address(&wallet.address)
            .with_details(json!({ "messageLength": request.message.len() })),
    );

    Ok(Json(SignMessageResponse {
        address: record.address,
        signature,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoginRequest, RegisterRequest};
    use axum::body::to_bytes;
    use axum::http::Request;

    async fn state_with_wallet() -> (AppState, String, String, tempfile::TempDir) {
        let (state, temp) = AppState::for_tests();
        let response = crate::api::wallet::register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "user@example.com".to_string(),
                password: "Str0ng-pass!".to_string(),
            }),
        )
        .await
        .unwrap();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        (
            state,
            body["walletAddress"].as_str().unwrap().to_string(),
            body["sessionToken"].as_str().unwrap().to_string(),
            temp,
        )
    }

    fn bare_parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn parts_with_header_token(token: &str) -> Parts {
        Request::builder()
            .uri("/test")
            .header("x-custodial-session", token)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn export_requires_session_and_password() {
        let (state, address, token, _temp) = state_with_wallet().await;

        // No session anywhere
        let err = export_private_key(
            State(state.clone()),
            bare_parts(),
            Json(ExportKeyRequest {
                password: "Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::AuthRequired));

        // Session but wrong password
        let err = export_private_key(
            State(state.clone()),
            parts_with_header_token(&token),
            Json(ExportKeyRequest {
                password: "Wrong-pass1!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::InvalidPassword));

        // Both factors present
        let response = export_private_key(
            State(state),
            bare_parts(),
            Json(ExportKeyRequest {
                password: "Str0ng-pass!".to_string(),
                session_token: Some(token),
            }),
        )
        .await
        .unwrap();
        assert!(response.0.private_key.starts_with("0x"));
        assert_eq!(response.0.private_key.len(), 66);
        assert_eq!(response.0.address, address);
        assert!(!response.0.warning.is_empty());
    }

    #[tokio::test]
    async fn exported_key_matches_wallet_address() {
        let (state, address, token, _temp) = state_with_wallet().await;
        let response = export_private_key(
            State(state),
            parts_with_header_token(&token),
            Json(ExportKeyRequest {
                password: "Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap();

        let raw = alloy::hex::decode(&response.0.private_key[2..]).unwrap();
        assert_eq!(keys::address_for_key(&raw).unwrap(), address);
    }

    #[tokio::test]
    async fn change_password_reencrypts_the_key() {
        let (state, _address, token, _temp) = state_with_wallet().await;

        change_password(
            State(state.clone()),
            parts_with_header_token(&token),
            Json(ChangePasswordRequest {
                current_password: "Str0ng-pass!".to_string(),
                new_password: "N3w-Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap();

        // Old password no longer unlocks the key, new one does
        let err = export_private_key(
            State(state.clone()),
            parts_with_header_token(&token),
            Json(ExportKeyRequest {
                password: "Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::InvalidPassword));

        let response = export_private_key(
            State(state.clone()),
            parts_with_header_token(&token),
            Json(ExportKeyRequest {
                password: "N3w-Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap();
        assert!(response.0.private_key.starts_with("0x"));

        // Login with the new password works too
        let response = crate::api::wallet::login(
            State(state),
            Json(LoginRequest {
                email: "user@example.com".to_string(),
                password: "N3w-Str0ng-pass!".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current_password() {
        let (state, _address, token, _temp) = state_with_wallet().await;
        let err = change_password(
            State(state),
            parts_with_header_token(&token),
            Json(ChangePasswordRequest {
                current_password: "Wrong-pass1!".to_string(),
                new_password: "N3w-Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::InvalidPassword));
    }

    #[tokio::test]
    async fn change_password_keeps_existing_sessions_alive() {
        let (state, address, token, _temp) = state_with_wallet().await;

        change_password(
            State(state.clone()),
            parts_with_header_token(&token),
            Json(ChangePasswordRequest {
                current_password: "Str0ng-pass!".to_string(),
                new_password: "N3w-Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap();

        // The session that performed the change still resolves
        let extracted = crate::auth::ExtractedToken {
            token,
            source: crate::auth::TokenSource::Header,
        };
        let wallet = authenticate(&state, Some(&extracted), Some(&address)).unwrap();
        assert_eq!(wallet.address, address);
    }

    #[tokio::test]
    async fn sign_message_produces_valid_signature_format() {
        let (state, address, token, _temp) = state_with_wallet().await;
        let response = sign_message(
            State(state),
            bare_parts(),
            Json(SignMessageRequest {
                address: address.clone(),
                message: "hello".to_string(),
                password: "Str0ng-pass!".to_string(),
                session_token: Some(token),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.address, address);
        assert!(response.0.signature.starts_with("0x"));
        assert_eq!(response.0.signature.len(), 132);
    }

    #[tokio::test]
    async fn sign_message_rejects_mismatched_address() {
        let (state, _address, token, _temp) = state_with_wallet().await;
        let err = sign_message(
            State(state),
            parts_with_header_token(&token),
            Json(SignMessageRequest {
                address: "0xdddd000000000000000000000000000000000002".to_string(),
                message: "hello".to_string(),
                password: "Str0ng-pass!".to_string(),
                session_token: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::Forbidden));
    }

    #[tokio::test]
    async fn body_token_unlocks_body_driven_handlers() {
        let (state, _address, token, _temp) = state_with_wallet().await;
        let response = change_password(
            State(state),
            bare_parts(),
            Json(ChangePasswordRequest {
                current_password: "Str0ng-pass!".to_string(),
                new_password: "N3w-Str0ng-pass!".to_string(),
                session_token: Some(token),
            }),
        )
        .await
        .unwrap();
        assert!(response.0.success);
    }
}
