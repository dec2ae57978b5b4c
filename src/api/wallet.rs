// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login, session check, logout, address validation and
//! wallet details.

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{extract_from_parts, ReadOnlyAuth, WalletAuth};
use crate::config::SESSION_COOKIE;
use crate::error::WalletError;
use crate::keys;
use crate::models::{
    validate_credentials, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest,
    RegisterResponse, SessionCheckResponse, ValidateResponse,
};
use crate::sessions::SessionManager;
use crate::state::AppState;
use crate::storage::{AuditEvent, AuditEventType, WalletInfo, WalletRecord};

/// Max-Age for the session cookie, aligned with the session TTL.
const COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Build the Set-Cookie value carrying a session token.
pub(crate) fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; \
         Max-Age={COOKIE_MAX_AGE_SECS}; Path=/"
    )
}

/// Build the Set-Cookie value that clears the session cookie.
pub(crate) fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Strict; Max-Age=0; Path=/")
}

/// Register a new custodial wallet.
///
/// Generates a keypair, encrypts the private key under the password, and
/// auto-logs the caller in.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/register",
    tag = "Wallet",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Wallet created", body = RegisterResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Email or address already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, WalletError> {
    let errors = validate_credentials(&request.email, &request.password);
    if !errors.is_empty() {
        return Err(WalletError::Validation(errors));
    }

    let vault = state.vault_handle();
    let password = request.password.clone();
    // Keypair generation and the PBKDF2/AEAD work are CPU-bound
    let (keypair, material) = tokio::task::spawn_blocking(move || {
        let keypair = keys::generate_keypair()?;
        let material = vault
            .encrypt_private_key(&keypair.private_key, &password)
            .map_err(|e| WalletError::Crypto(e.to_string()))?;
        Ok::<_, WalletError>((keypair, material))
    })
    .await
    .map_err(|e| WalletError::Crypto(e.to_string()))??;

    let now = Utc::now();
    let record = WalletRecord {
        wallet_id: Uuid::new_v4(),
        address: keypair.address.clone(),
        email: request.email.to_lowercase(),
        password_hash: material.password_hash,
        password_salt: material.password_salt,
        encrypted_private_key: material.ciphertext,
        encryption_iv: material.iv,
        kdf_salt: material.kdf_salt,
        active: true,
        created_at: now,
        updated_at: now,
        last_login_at: Some(now),
    };
    state.db().create_wallet(&record)?;

    let _ = state.db().append_audit(
        &AuditEvent::new(AuditEventType::WalletCreated)
            .with_wallet(record.wallet_id.to_string())
            .with_address(&record.address),
    );

    let session = SessionManager::new(state.db()).create_session(record.wallet_id, &record.address)?;

    tracing::info!(wallet_id = %record.wallet_id, "wallet registered");

    let body = RegisterResponse {
        wallet_address: record.address,
        session_token: session.token.clone(),
        created_at: record.created_at,
    };
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, session_cookie(&session.token))],
        Json(body),
    )
        .into_response())
}

/// Log in with email and password.
///
/// Unknown email, wrong password, and deactivated wallet all answer with the
/// same 401.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/login",
    tag = "Wallet",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session minted", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, WalletError> {
    let wallet = match state.db().get_wallet_by_email(&request.email)? {
        Some(w) if w.active => w,
        _ => {
            let _ = state
                .db()
                .append_audit(&AuditEvent::new(AuditEventType::LoginFailure).failed());
            return Err(WalletError::InvalidCredentials);
        }
    };

    let vault = state.vault_handle();
    let password = request.password.clone();
    let hash = wallet.password_hash.clone();
    let salt = wallet.password_salt.clone();
    let verified = tokio::task::spawn_blocking(move || {
        vault.verify_password(&password, &hash, &salt).is_ok()
    })
    .await
    .map_err(|e| WalletError::Crypto(e.to_string()))?;

    if !verified {
        let _ = state.db().append_audit(
            &AuditEvent::new(AuditEventType::LoginFailure)
                .with_wallet(wallet.wallet_id.to_string())
                .with_address(&wallet.address)
                .failed(),
        );
        return Err(WalletError::InvalidCredentials);
    }

    // Best-effort; a failed timestamp update must not fail the login
    if let Err(e) = state.db().touch_last_login(wallet.wallet_id, Utc::now()) {
        tracing::warn!(wallet_id = %wallet.wallet_id, error = %e, "last_login update failed");
    }

    let session = SessionManager::new(state.db()).create_session(wallet.wallet_id, &wallet.address)?;

    let _ = state.db().append_audit(
        &AuditEvent::new(AuditEventType::LoginSuccess)
            .with_wallet(wallet.wallet_id.to_string())
            .with_address(&wallet.address),
    );

    let body = LoginResponse {
        wallet_address: wallet.address,
        session_token: session.token.clone(),
        expires_at: session.expires_at,
    };
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, session_cookie(&session.token))],
        Json(body),
    )
        .into_response())
}

/// Report whether the caller has a live session.
///
/// Always 200; an absent or invalid session is `authenticated: false`.
#[utoipa::path(
    get,
    path = "/v1/custodial-wallet/session",
    tag = "Wallet",
    responses(
        (status = 200, description = "Session status", body = SessionCheckResponse)
    )
)]
pub async fn session_check(
    State(state): State<AppState>,
    ReadOnlyAuth(wallet): ReadOnlyAuth,
) -> Result<Json<SessionCheckResponse>, WalletError> {
    let wallet_info = match &wallet {
        Some(auth) => state
            .db()
            .get_wallet(auth.wallet_id)?
            .as_ref()
            .map(WalletInfo::from),
        None => None,
    };
    Ok(Json(SessionCheckResponse {
        authenticated: wallet.is_some(),
        wallet_info,
    }))
}

/// Destroy the caller's session. Idempotent; a missing or unknown token
/// still succeeds and the cookie is cleared either way.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/logout",
    tag = "Wallet",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse)
    )
)]
pub async fn logout(State(state): State<AppState>, parts: Parts) -> Result<Response, WalletError> {
    if let Some(extracted) = extract_from_parts(&parts) {
        let destroyed = SessionManager::new(state.db()).destroy_session(&extracted.token)?;
        if destroyed {
            let _ = state
                .db()
                .append_audit(&AuditEvent::new(AuditEventType::SessionDestroyed));
        }
    }
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_session_cookie())],
        Json(LogoutResponse { success: true }),
    )
        .into_response())
}

/// Validate that the caller's session is bound to the given address.
#[utoipa::path(
    get,
    path = "/v1/custodial-wallet/{address}/validate",
    tag = "Wallet",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Session matches the address", body = ValidateResponse),
        (status = 401, description = "No or invalid session"),
        (status = 403, description = "Session bound to a different address")
    )
)]
pub async fn validate_address(
    WalletAuth(wallet): WalletAuth,
) -> Result<Json<ValidateResponse>, WalletError> {
    Ok(Json(ValidateResponse {
        valid: true,
        address: wallet.address,
        expires_at: wallet.expires_at,
    }))
}

/// Fetch wallet details. Session-gated; the session must be bound to the
/// requested address.
#[utoipa::path(
    get,
    path = "/v1/custodial-wallet/{address}",
    tag = "Wallet",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Wallet details", body = WalletInfo),
        (status = 401, description = "No or invalid session"),
        (status = 403, description = "Session bound to a different address"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn wallet_details(
    State(state): State<AppState>,
    Path(_address): Path<String>,
    WalletAuth(wallet): WalletAuth,
) -> Result<Json<WalletInfo>, WalletError> {
    let record = state
        .db()
        .get_wallet(wallet.wallet_id)?
        .ok_or(WalletError::WalletNotFound)?;
    Ok(Json(WalletInfo::from(&record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{authenticate, ExtractedToken, TokenSource};
    use axum::body::to_bytes;

    async fn register_wallet(state: &AppState, email: &str) -> (String, String) {
        let response = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: email.to_string(),
                password: "Str0ng-pass!".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        (
            body["walletAddress"].as_str().unwrap().to_string(),
            body["sessionToken"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn register_then_login_mints_fresh_session() {
        let (state, _temp) = AppState::for_tests();
        let (address, register_token) = register_wallet(&state, "user@example.com").await;
        assert_eq!(address, address.to_lowercase());

        let response = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "USER@example.com".to_string(),
                password: "Str0ng-pass!".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["walletAddress"], address);
        assert_ne!(body["sessionToken"], register_token);
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let (state, _temp) = AppState::for_tests();
        let err = register(
            State(state),
            Json(RegisterRequest {
                email: "user@example.com".to_string(),
                password: "weak".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let (state, _temp) = AppState::for_tests();
        register_wallet(&state, "user@example.com").await;

        let err = register(
            State(state),
            Json(RegisterRequest {
                email: "User@Example.com".to_string(),
                password: "Str0ng-pass!".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalletError::DuplicateEmail));
    }

    #[tokio::test]
    async fn login_is_uniform_for_unknown_email_and_wrong_password() {
        let (state, _temp) = AppState::for_tests();
        register_wallet(&state, "user@example.com").await;

        for (email, password) in [
            ("ghost@example.com", "Str0ng-pass!"),
            ("user@example.com", "Wrong-pass1!"),
        ] {
            let err = login(
                State(state.clone()),
                Json(LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, WalletError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn session_token_resolves_to_registered_wallet() {
        let (state, _temp) = AppState::for_tests();
        let (address, token) = register_wallet(&state, "user@example.com").await;

        let extracted = ExtractedToken {
            token,
            source: TokenSource::Header,
        };
        let wallet = authenticate(&state, Some(&extracted), Some(&address)).unwrap();
        assert_eq!(wallet.address, address);
    }

    #[tokio::test]
    async fn logout_invalidates_session_and_is_idempotent() {
        let (state, _temp) = AppState::for_tests();
        let (_address, token) = register_wallet(&state, "user@example.com").await;

        let parts_with_token = |token: &str| {
            axum::http::Request::builder()
                .uri("/v1/custodial-wallet/logout")
                .header("x-custodial-session", token)
                .body(())
                .unwrap()
                .into_parts()
                .0
        };
        let response = logout(State(state.clone()), parts_with_token(&token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));

        // Session is gone now
        let extracted = ExtractedToken {
            token: token.clone(),
            source: TokenSource::Header,
        };
        assert!(authenticate(&state, Some(&extracted), None).is_err());

        // Second logout still succeeds
        let response = logout(State(state), parts_with_token(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn session_check_reports_unauthenticated_without_session() {
        let (state, _temp) = AppState::for_tests();
        let Json(body) = session_check(State(state), ReadOnlyAuth(None)).await.unwrap();
        assert!(!body.authenticated);
        assert!(body.wallet_info.is_none());
    }

    #[tokio::test]
    async fn register_response_carries_session_cookie() {
        let (state, _temp) = AppState::for_tests();
        let response = register(
            State(state),
            Json(RegisterRequest {
                email: "user@example.com".to_string(),
                password: "Str0ng-pass!".to_string(),
            }),
        )
        .await
        .unwrap();

        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("custodialSession="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }
}
