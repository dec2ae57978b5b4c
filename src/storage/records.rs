// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent record types for the wallet database.
//!
//! Records are stored as JSON values in redb tables. Address and email are
//! lowercased before they ever reach storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A custodial wallet record.
///
/// Credential fields (`password_hash`, `password_salt`,
/// `encrypted_private_key`, `encryption_iv`, `kdf_salt`) are hex strings
/// produced by the credential vault. They never leave the storage layer via
/// [`WalletInfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRecord {
    pub wallet_id: Uuid,
    /// Lowercase 0x-prefixed Ethereum address.
    pub address: String,
    /// Lowercase email.
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub encrypted_private_key: String,
    pub encryption_iv: String,
    pub kdf_salt: String,
    /// Soft-deactivation flag. Inactive wallets reject login and session
    /// resolution.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// A bearer session.
///
/// Expired sessions read as not-found; there is no renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// UUIDv4 session token.
    pub token: String,
    pub wallet_id: Uuid,
    /// Lowercase address, denormalized for the auth path.
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A single-use password recovery token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryToken {
    /// 64 hex chars (32 random bytes).
    pub token: String,
    pub wallet_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl RecoveryToken {
    /// Usable: not yet spent and not past its expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// API-safe projection of a wallet record. Carries no credential material.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub wallet_id: Uuid,
    pub address: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// Falls back to `created_at` for wallets that never logged in.
    pub last_login_at: DateTime<Utc>,
}

impl From<&WalletRecord> for WalletInfo {
    fn from(record: &WalletRecord) -> Self {
        Self {
            wallet_id: record.wallet_id,
            address: record.address.clone(),
            email: record.email.clone(),
            created_at: record.created_at,
            last_login_at: record.last_login_at.unwrap_or(record.created_at),
        }
    }
}
