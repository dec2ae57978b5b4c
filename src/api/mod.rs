// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::{ErrorBody, FieldError},
    models::{
        ChangePasswordRequest, ChangePasswordResponse, ExportKeyRequest, ExportKeyResponse,
        GenericRecoveryResponse, LoginRequest, LoginResponse, LogoutResponse,
        RecoveryRequestBody, RecoveryResetRequest, RecoveryVerifyResponse, RegisterRequest,
        RegisterResponse, SessionCheckResponse, SignMessageRequest, SignMessageResponse,
        ValidateResponse,
    },
    state::AppState,
    storage::WalletInfo,
};

pub mod health;
pub mod keys;
pub mod recovery;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    // Static segments are matched before the `{address}` wildcard
    let custodial_routes = Router::new()
        .route("/register", post(wallet::register))
        .route("/login", post(wallet::login))
        .route("/session", get(wallet::session_check))
        .route("/logout", post(wallet::logout))
        .route("/recovery/request", post(recovery::recovery_request))
        .route("/recovery/verify/{token}", get(recovery::recovery_verify))
        .route("/recovery/reset", post(recovery::recovery_reset))
        .route("/change-password", post(keys::change_password))
        .route("/export-private-key", post(keys::export_private_key))
        .route("/sign-message", post(keys::sign_message))
        .route("/{address}", get(wallet::wallet_details))
        .route("/{address}/validate", get(wallet::validate_address));

    Router::new()
        .nest("/v1/custodial-wallet", custodial_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        wallet::register,
        wallet::login,
        wallet::session_check,
        wallet::logout,
        wallet::validate_address,
        wallet::wallet_details,
        recovery::recovery_request,
        recovery::recovery_verify,
        recovery::recovery_reset,
        keys::change_password,
        keys::export_private_key,
        keys::sign_message,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            SessionCheckResponse,
            LogoutResponse,
            ValidateResponse,
            WalletInfo,
            RecoveryRequestBody,
            GenericRecoveryResponse,
            RecoveryVerifyResponse,
            RecoveryResetRequest,
            ChangePasswordRequest,
            ChangePasswordResponse,
            ExportKeyRequest,
            ExportKeyResponse,
            SignMessageRequest,
            SignMessageResponse,
            ErrorBody,
            FieldError
        )
    ),
    tags(
        (name = "Wallet", description = "Registration, sessions and wallet details"),
        (name = "Recovery", description = "Password recovery flows"),
        (name = "Keys", description = "Password change, key export and message signing"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _temp) = AppState::for_tests();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
