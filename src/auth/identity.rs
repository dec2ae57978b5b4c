// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed request identity produced by the auth extractors.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where an authenticated identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Backed by a real session row in storage.
    Real,
    /// The fixed synthetic test wallet, reachable only when
    /// `TEST_WALLET_ENABLED` is set at startup.
    SyntheticTest,
}

/// The authenticated wallet attached to a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedWallet {
    pub wallet_id: Uuid,
    /// Lowercase address.
    pub address: String,
    /// The session token that authenticated this request.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

impl AuthenticatedWallet {
    pub fn is_synthetic(&self) -> bool {
        self.identity == Identity::SyntheticTest
    }
}
