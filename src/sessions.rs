// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer session lifecycle: mint, verify, destroy.
//!
//! Tokens are UUIDv4 strings with a fixed 7-day expiry. There is no renewal;
//! an expired session is indistinguishable from one that never existed.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::storage::{DbResult, Session, WalletDatabase};

/// Session lifetime.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Repository-style manager over the sessions table.
pub struct SessionManager<'a> {
    db: &'a WalletDatabase,
}

impl<'a> SessionManager<'a> {
    pub fn new(db: &'a WalletDatabase) -> Self {
        Self { db }
    }

    /// Mint a new session for a wallet.
    pub fn create_session(&self, wallet_id: Uuid, address: &str) -> DbResult<Session> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            wallet_id,
            address: address.to_lowercase(),
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        };
        self.db.insert_session(&session)?;
        Ok(session)
    }

    /// Resolve a token to a live session.
    ///
    /// Returns `None` for unknown tokens, expired sessions, and sessions
    /// whose wallet has been deactivated. Callers cannot distinguish these.
    pub fn verify_session(&self, token: &str) -> DbResult<Option<Session>> {
        let session = match self.db.get_session(token)? {
            Some(s) => s,
            None => return Ok(None),
        };
        if session.is_expired(Utc::now()) {
            return Ok(None);
        }
        match self.db.get_wallet(session.wallet_id)? {
            Some(wallet) if wallet.active => Ok(Some(session)),
            _ => Ok(None),
        }
    }

    /// Destroy a session. Destroying an unknown token succeeds.
    pub fn destroy_session(&self, token: &str) -> DbResult<bool> {
        self.db.delete_session(token)
    }
}
