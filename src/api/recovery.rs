// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password recovery endpoints: request, verify, reset.

use axum::{
    extract::{Path, State},
    Json,
};
use crate::email::{recovery_email, send_outcome_details};
use crate::error::WalletError;
use crate::models::{
    validate_email, validate_password_policy, GenericRecoveryResponse, RecoveryRequestBody,
    RecoveryResetRequest, RecoveryVerifyResponse,
};
use crate::recovery::RecoveryManager;
use crate::state::AppState;
use crate::storage::{AuditEvent, AuditEventType};

/// Request a password recovery email.
///
/// The response does not reveal whether the email is registered.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/recovery/request",
    tag = "Recovery",
    request_body = RecoveryRequestBody,
    responses(
        (status = 200, description = "Accepted", body = GenericRecoveryResponse),
        (status = 400, description = "Malformed email")
    )
)]
pub async fn recovery_request(
    State(state): State<AppState>,
    Json(request): Json<RecoveryRequestBody>,
) -> Result<Json<GenericRecoveryResponse>, WalletError> {
    if let Some(error) = validate_email(&request.email) {
        return Err(WalletError::Validation(vec![error]));
    }

    let recovery = RecoveryManager::new(state.db(), state.vault());
    if let Some(token) = recovery.initiate_recovery(&request.email)? {
        let email = recovery_email(&state.config().app_url, &token.email, &token.token);
        let delivered = match state.mailer().send(&email) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "recovery email delivery failed");
                false
            }
        };
        let _ = state.db().append_audit(
            &AuditEvent::new(AuditEventType::RecoveryRequested)
                .with_wallet(token.wallet_id.to_string())
                .with_details(send_outcome_details(&email, delivered)),
        );
    }

    Ok(Json(GenericRecoveryResponse::standard()))
}

/// Check a recovery token without consuming it.
#[utoipa::path(
    get,
    path = "/v1/custodial-wallet/recovery/verify/{token}",
    tag = "Recovery",
    params(("token" = String, Path, description = "Recovery token")),
    responses(
        (status = 200, description = "Token is usable", body = RecoveryVerifyResponse),
        (status = 400, description = "Token invalid, expired or spent")
    )
)]
pub async fn recovery_verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<RecoveryVerifyResponse>, WalletError> {
    let recovery = RecoveryManager::new(state.db(), state.vault());
    let record = recovery
        .verify_recovery_token(&token)?
        .ok_or(WalletError::InvalidRecoveryToken)?;
    Ok(Json(RecoveryVerifyResponse {
        valid: true,
        expires_at: record.expires_at,
    }))
}

/// Consume a recovery token and set a new password.
#[utoipa::path(
    post,
    path = "/v1/custodial-wallet/recovery/reset",
    tag = "Recovery",
    request_body = RecoveryResetRequest,
    responses(
        (status = 200, description = "Password replaced", body = GenericRecoveryResponse),
        (status = 400, description = "Weak password, or token invalid/expired/spent")
    )
)]
pub async fn recovery_reset(
    State(state): State<AppState>,
    Json(request): Json<RecoveryResetRequest>,
) -> Result<Json<GenericRecoveryResponse>, WalletError> {
    let errors = validate_password_policy("newPassword", &request.new_password);
    if !errors.is_empty() {
        return Err(WalletError::Validation(errors));
    }

    let db = state.db_handle();
    let vault = state.vault_handle();
    let token = request.token.clone();
    let new_password = request.new_password.clone();
    let record = tokio::task::spawn_blocking(move || {
        RecoveryManager::new(&db, &vault).reset_password(&token, &new_password)
    })
    .await
    .map_err(|e| WalletError::Crypto(e.to_string()))??;

    let _ = state.db().append_audit(
        &AuditEvent::new(AuditEventType::PasswordReset)
            .with_wallet(record.wallet_id.to_string())
            .with_address(&record.address),
    );

    tracing::info!(wallet_id = %record.wallet_id, "password reset via recovery token");

    Ok(Json(GenericRecoveryResponse {
        success: true,
        message: "Password has been reset".to_string(),
    }))
}
