// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for session-authenticated wallets.
//!
//! Use `WalletAuth` in handlers to require a live session:
//!
//! ```rust,ignore
//! async fn my_handler(WalletAuth(wallet): WalletAuth) -> impl IntoResponse {
//!     // wallet is AuthenticatedWallet
//! }
//! ```
//!
//! ## Resolution order
//!
//! 1. An `AuthenticatedWallet` already in request extensions wins.
//! 2. With the test wallet enabled and the request targeting its fixed
//!    address, a synthetic identity is issued (no real token required, and
//!    the fixed test token is accepted).
//! 3. No token anywhere is `NO_SESSION`; a token that does not resolve is
//!    `INVALID_SESSION`.
//! 4. A target address that differs from the session's binding is
//!    `ADDRESS_MISMATCH`.

use axum::{
    extract::{FromRequestParts, RawPathParams},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::error::AuthError;
use super::identity::{AuthenticatedWallet, Identity};
use super::token::{extract_from_parts, ExtractedToken};
use crate::config::{TEST_WALLET_ADDRESS, TEST_WALLET_SESSION_TOKEN};
use crate::sessions::{SessionManager, SESSION_TTL_DAYS};
use crate::state::AppState;

/// Header fallback for the target address when there is no `address` path
/// parameter (body-driven routes name their wallet here).
const WALLET_ADDRESS_HEADER: &str = "x-wallet-address";

/// Resolve a candidate token (and optional target address) to an identity.
///
/// This is the single authentication algorithm; the extractors and the
/// body-token handlers all funnel through it.
pub fn authenticate(
    state: &AppState,
    candidate: Option<&ExtractedToken>,
    target_address: Option<&str>,
) -> Result<AuthenticatedWallet, AuthError> {
    let target = target_address.map(|a| a.to_lowercase());

    // Synthetic test identity, only when enabled and only for its fixed
    // address. A real token for another wallet still goes through the
    // normal path below.
    if state.config().test_wallet_enabled && target.as_deref() == Some(TEST_WALLET_ADDRESS) {
        let token_matches = match candidate {
            None => true,
            Some(extracted) => extracted.token == TEST_WALLET_SESSION_TOKEN,
        };
        if token_matches {
            return Ok(AuthenticatedWallet {
                wallet_id: Uuid::nil(),
                address: TEST_WALLET_ADDRESS.to_string(),
                token: TEST_WALLET_SESSION_TOKEN.to_string(),
                expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS),
                identity: Identity::SyntheticTest,
            });
        }
    }

    let extracted = candidate.ok_or(AuthError::NoSession)?;

    let sessions = SessionManager::new(state.db());
    let session = sessions
        .verify_session(&extracted.token)
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::InvalidSession)?;

    if let Some(requested) = target {
        if requested != session.address {
            return Err(AuthError::AddressMismatch {
                requested,
                session: session.address,
            });
        }
    }

    Ok(AuthenticatedWallet {
        wallet_id: session.wallet_id,
        address: session.address,
        token: session.token,
        expires_at: session.expires_at,
        identity: Identity::Real,
    })
}

/// Pull the target address from the `address` path parameter, falling back
/// to the `x-wallet-address` header.
async fn target_address(parts: &mut Parts, state: &AppState) -> Option<String> {
    if let Ok(params) = RawPathParams::from_request_parts(parts, state).await {
        for (name, value) in params.iter() {
            if name == "address" {
                return Some(value.to_string());
            }
        }
    }
    parts
        .headers
        .get(WALLET_ADDRESS_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Extractor requiring a live wallet session.
#[derive(Debug)]
pub struct WalletAuth(pub AuthenticatedWallet);

impl FromRequestParts<AppState> for WalletAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the wallet
        if let Some(wallet) = parts.extensions.get::<AuthenticatedWallet>().cloned() {
            return Ok(WalletAuth(wallet));
        }

        let target = target_address(parts, state).await;
        let candidate = extract_from_parts(parts);
        let wallet = authenticate(state, candidate.as_ref(), target.as_deref())?;
        Ok(WalletAuth(wallet))
    }
}

/// Relaxed extractor for read-only surfaces.
///
/// Yields `None` instead of rejecting when no valid session is present.
/// Never attached to anything that mutates state.
pub struct ReadOnlyAuth(pub Option<AuthenticatedWallet>);

impl FromRequestParts<AppState> for ReadOnlyAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match WalletAuth::from_request_parts(parts, state).await {
            Ok(WalletAuth(wallet)) => Ok(ReadOnlyAuth(Some(wallet))),
            Err(_) => Ok(ReadOnlyAuth(None)),
        }
    }
}
