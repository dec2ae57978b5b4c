// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password recovery: single-use, short-lived reset tokens.
//!
//! `initiate_recovery` is enumeration-safe: an unknown or deactivated email
//! is a silent no-op and the HTTP layer answers identically either way.
//! Consumption is atomic; see
//! [`WalletDatabase::consume_recovery_token`](crate::storage::WalletDatabase::consume_recovery_token).

use chrono::{Duration, Utc};

use crate::storage::{DbError, RecoveryToken, WalletDatabase, WalletRecord};
use crate::vault::{CredentialVault, VaultError};

/// Recovery token lifetime.
pub const RECOVERY_TTL_MINUTES: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

impl From<RecoveryError> for crate::error::WalletError {
    fn from(e: RecoveryError) -> Self {
        use crate::error::WalletError;
        match e {
            RecoveryError::Db(DbError::RecoveryTokenInvalid) => WalletError::InvalidRecoveryToken,
            RecoveryError::Db(db) => WalletError::from(db),
            RecoveryError::Vault(v) => WalletError::Crypto(v.to_string()),
        }
    }
}

/// Repository-style manager over the recovery_tokens table.
pub struct RecoveryManager<'a> {
    db: &'a WalletDatabase,
    vault: &'a CredentialVault,
}

impl<'a> RecoveryManager<'a> {
    pub fn new(db: &'a WalletDatabase, vault: &'a CredentialVault) -> Self {
        Self { db, vault }
    }

    /// Issue a recovery token for the wallet registered under `email`.
    ///
    /// Returns `None` when no active wallet matches; the caller must answer
    /// the same way in both cases.
    pub fn initiate_recovery(&self, email: &str) -> RecoveryResult<Option<RecoveryToken>> {
        let wallet = match self.db.get_wallet_by_email(email)? {
            Some(w) if w.active => w,
            _ => return Ok(None),
        };

        let token = RecoveryToken {
            token: self.vault.generate_recovery_token()?,
            wallet_id: wallet.wallet_id,
            email: wallet.email,
            expires_at: Utc::now() + Duration::minutes(RECOVERY_TTL_MINUTES),
            used: false,
        };
        self.db.insert_recovery_token(&token)?;
        Ok(Some(token))
    }

    /// Check a token without consuming it.
    pub fn verify_recovery_token(&self, token: &str) -> RecoveryResult<Option<RecoveryToken>> {
        match self.db.get_recovery_token(token)? {
            Some(t) if t.is_valid(Utc::now()) => Ok(Some(t)),
            _ => Ok(None),
        }
    }

    /// Consume a token and set a new password.
    ///
    /// Derives fresh password material, then marks the token used and
    /// replaces hash and salt in one storage transaction. The stored key
    /// ciphertext stays as it was; without the old password it cannot be
    /// re-encrypted.
    pub fn reset_password(&self, token: &str, new_password: &str) -> RecoveryResult<WalletRecord> {
        let material = self.vault.hash_password(new_password)?;
        let record = self.db.consume_recovery_token(
            token,
            &material.password_hash,
            &material.password_salt,
            Utc::now(),
        )?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn setup() -> (TempDir, WalletDatabase, CredentialVault) {
        let temp = TempDir::new().unwrap();
        let db = WalletDatabase::open(&temp.path().join("custodial.redb")).unwrap();
        (temp, db, CredentialVault::new())
    }

    fn insert_wallet(db: &WalletDatabase, vault: &CredentialVault, password: &str) -> WalletRecord {
        let material = vault.encrypt_private_key(&[0x11u8; 32], password).unwrap();
        let now = Utc::now();
        let record = WalletRecord {
            wallet_id: Uuid::new_v4(),
            address: "0xabc0000000000000000000000000000000000001".to_string(),
            email: "user@example.com".to_string(),
            password_hash: material.password_hash,
            password_salt: material.password_salt,
            encrypted_private_key: material.ciphertext,
            encryption_iv: material.iv,
            kdf_salt: material.kdf_salt,
            active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        db.create_wallet(&record).unwrap();
        record
    }

    #[test]
    fn unknown_email_yields_none() {
        let (_temp, db, vault) = setup();
        let recovery = RecoveryManager::new(&db, &vault);
        assert!(recovery
            .initiate_recovery("ghost@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn issued_token_verifies_then_consumes_once() {
        let (_temp, db, vault) = setup();
        let wallet = insert_wallet(&db, &vault, "Old-Password1!");
        let recovery = RecoveryManager::new(&db, &vault);

        let token = recovery
            .initiate_recovery("USER@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(token.wallet_id, wallet.wallet_id);
        assert_eq!(token.token.len(), 64);

        assert!(recovery
            .verify_recovery_token(&token.token)
            .unwrap()
            .is_some());

        let updated = recovery
            .reset_password(&token.token, "New-Password1!")
            .unwrap();
        assert_ne!(updated.password_hash, wallet.password_hash);
        assert!(vault
            .verify_password("New-Password1!", &updated.password_hash, &updated.password_salt)
            .is_ok());

        // Token is spent now
        assert!(recovery
            .verify_recovery_token(&token.token)
            .unwrap()
            .is_none());
        assert!(recovery
            .reset_password(&token.token, "Third-Password1!")
            .is_err());
    }

    #[test]
    fn reset_keeps_ciphertext_in_place() {
        let (_temp, db, vault) = setup();
        let wallet = insert_wallet(&db, &vault, "Old-Password1!");
        let recovery = RecoveryManager::new(&db, &vault);

        let token = recovery
            .initiate_recovery(&wallet.email)
            .unwrap()
            .unwrap();
        let updated = recovery
            .reset_password(&token.token, "New-Password1!")
            .unwrap();

        assert_eq!(updated.encrypted_private_key, wallet.encrypted_private_key);
        assert_eq!(updated.encryption_iv, wallet.encryption_iv);
        assert_eq!(updated.kdf_salt, wallet.kdf_salt);
    }

    #[test]
    fn verify_is_read_only() {
        let (_temp, db, vault) = setup();
        let wallet = insert_wallet(&db, &vault, "Old-Password1!");
        let recovery = RecoveryManager::new(&db, &vault);

        let token = recovery
            .initiate_recovery(&wallet.email)
            .unwrap()
            .unwrap();
        for _ in 0..3 {
            assert!(recovery
                .verify_recovery_token(&token.token)
                .unwrap()
                .is_some());
        }
    }
}
