// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded wallet database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `wallets`: wallet_id → serialized WalletRecord
//! - `wallet_address_idx`: lowercase address → wallet_id
//! - `wallet_email_idx`: lowercase email → wallet_id
//! - `sessions`: session token → serialized Session
//! - `recovery_tokens`: recovery token → serialized RecoveryToken
//! - `audit`: composite key (timestamp_be|event_id) → serialized AuditEvent
//!
//! redb has a single writer, so everything done inside one write transaction
//! is serialized against all other writes. Uniqueness checks for address and
//! email happen in the same write transaction as the record insert, and
//! recovery-token consumption reads, validates, marks used and rewrites the
//! wallet in one transaction.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::audit::AuditEvent;
use super::records::{RecoveryToken, Session, WalletRecord};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: wallet_id (UUID string) → serialized WalletRecord (JSON bytes).
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Index: lowercase address → wallet_id.
const WALLET_ADDRESS_IDX: TableDefinition<&str, &str> =
    TableDefinition::new("wallet_address_idx");

/// Index: lowercase email → wallet_id.
const WALLET_EMAIL_IDX: TableDefinition<&str, &str> = TableDefinition::new("wallet_email_idx");

/// Sessions: token → serialized Session (JSON bytes).
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Recovery tokens: token → serialized RecoveryToken (JSON bytes).
const RECOVERY_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("recovery_tokens");

/// Audit log: composite key → serialized AuditEvent (JSON bytes).
/// Key format: `timestamp_be_bytes|event_id` for chronological range scans.
const AUDIT: TableDefinition<&[u8], &[u8]> = TableDefinition::new("audit");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("address already registered")]
    DuplicateAddress,

    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    #[error("recovery token invalid, expired or already used")]
    RecoveryTokenInvalid,
}

pub type DbResult<T> = Result<T, DbError>;

/// Build the composite key for the audit table.
///
/// Format: `timestamp_millis_be_bytes | event_id`, so a forward scan yields
/// events in chronological order.
fn make_audit_key(timestamp: DateTime<Utc>, event_id: &str) -> Vec<u8> {
    let millis = timestamp.timestamp_millis() as u64;
    let mut key = Vec::with_capacity(8 + 1 + event_id.len());
    key.extend_from_slice(&millis.to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(event_id.as_bytes());
    key
}

// =============================================================================
// WalletDatabase
// =============================================================================

/// Embedded ACID wallet database.
pub struct WalletDatabase {
    db: Database,
}

impl WalletDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_ADDRESS_IDX)?;
            let _ = write_txn.open_table(WALLET_EMAIL_IDX)?;
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(RECOVERY_TOKENS)?;
            let _ = write_txn.open_table(AUDIT)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap liveness probe: can we begin a read transaction.
    pub fn health_check(&self) -> DbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(WALLETS)?;
        Ok(())
    }

    // =========================================================================
    // Wallet CRUD
    // =========================================================================

    /// Insert a new wallet, enforcing email and address uniqueness.
    ///
    /// The index lookups and the insert happen inside one write transaction,
    /// so two concurrent registrations with the same email cannot both
    /// succeed.
    pub fn create_wallet(&self, record: &WalletRecord) -> DbResult<()> {
        let json = serde_json::to_vec(record)?;
        let wallet_id = record.wallet_id.to_string();
        let address = record.address.to_lowercase();
        let email = record.email.to_lowercase();

        let write_txn = self.db.begin_write()?;
        {
            let mut email_idx = write_txn.open_table(WALLET_EMAIL_IDX)?;
            if email_idx.get(email.as_str())?.is_some() {
                return Err(DbError::DuplicateEmail);
            }
            let mut addr_idx = write_txn.open_table(WALLET_ADDRESS_IDX)?;
            if addr_idx.get(address.as_str())?.is_some() {
                return Err(DbError::DuplicateAddress);
            }

            let mut wallets = write_txn.open_table(WALLETS)?;
            wallets.insert(wallet_id.as_str(), json.as_slice())?;
            email_idx.insert(email.as_str(), wallet_id.as_str())?;
            addr_idx.insert(address.as_str(), wallet_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a wallet by ID.
    pub fn get_wallet(&self, wallet_id: Uuid) -> DbResult<Option<WalletRecord>> {
        let id = wallet_id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a wallet by address (case-insensitive).
    pub fn get_wallet_by_address(&self, address: &str) -> DbResult<Option<WalletRecord>> {
        let addr = address.to_lowercase();
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(WALLET_ADDRESS_IDX)?;
        let wallet_id = match idx.get(addr.as_str())? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let wallets = read_txn.open_table(WALLETS)?;
        match wallets.get(wallet_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a wallet by email (case-insensitive).
    pub fn get_wallet_by_email(&self, email: &str) -> DbResult<Option<WalletRecord>> {
        let email = email.to_lowercase();
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(WALLET_EMAIL_IDX)?;
        let wallet_id = match idx.get(email.as_str())? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let wallets = read_txn.open_table(WALLETS)?;
        match wallets.get(wallet_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Replace password material, and optionally the encrypted key bundle
    /// (ciphertext, IV, KDF salt) when the caller re-encrypted the key.
    pub fn update_password_material(
        &self,
        wallet_id: Uuid,
        password_hash: &str,
        password_salt: &str,
        reencrypted: Option<(&str, &str, &str)>,
    ) -> DbResult<()> {
        let id = wallet_id.to_string();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;
            let existing_bytes = {
                let existing = table
                    .get(id.as_str())?
                    .ok_or_else(|| DbError::WalletNotFound(id.clone()))?;
                existing.value().to_vec()
            };

            let mut record: WalletRecord = serde_json::from_slice(&existing_bytes)?;
            record.password_hash = password_hash.to_string();
            record.password_salt = password_salt.to_string();
            if let Some((ciphertext, iv, kdf_salt)) = reencrypted {
                record.encrypted_private_key = ciphertext.to_string();
                record.encryption_iv = iv.to_string();
                record.kdf_salt = kdf_salt.to_string();
            }
            record.updated_at = Utc::now();

            let json = serde_json::to_vec(&record)?;
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Flip the soft-deactivation flag. Wallets are never hard-deleted;
    /// inactive wallets reject login and session resolution.
    pub fn set_active(&self, wallet_id: Uuid, active: bool) -> DbResult<()> {
        let id = wallet_id.to_string();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;
            let existing_bytes = {
                let existing = table
                    .get(id.as_str())?
                    .ok_or_else(|| DbError::WalletNotFound(id.clone()))?;
                existing.value().to_vec()
            };
            let mut record: WalletRecord = serde_json::from_slice(&existing_bytes)?;
            record.active = active;
            record.updated_at = Utc::now();
            let json = serde_json::to_vec(&record)?;
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Record a successful login time.
    pub fn touch_last_login(&self, wallet_id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        let id = wallet_id.to_string();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;
            let existing_bytes = {
                let existing = table
                    .get(id.as_str())?
                    .ok_or_else(|| DbError::WalletNotFound(id.clone()))?;
                existing.value().to_vec()
            };
            let mut record: WalletRecord = serde_json::from_slice(&existing_bytes)?;
            record.last_login_at = Some(at);
            record.updated_at = at;
            let json = serde_json::to_vec(&record)?;
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Store a session under its token.
    pub fn insert_session(&self, session: &Session) -> DbResult<()> {
        let json = serde_json::to_vec(session)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(session.token.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a session by token. Expiry is the caller's concern.
    pub fn get_session(&self, token: &str) -> DbResult<Option<Session>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        match table.get(token)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Delete a session. Returns whether it existed; deleting an absent
    /// token is not an error.
    pub fn delete_session(&self, token: &str) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(token)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    // =========================================================================
    // Recovery tokens
    // =========================================================================

    /// Store a recovery token.
    pub fn insert_recovery_token(&self, token: &RecoveryToken) -> DbResult<()> {
        let json = serde_json::to_vec(token)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECOVERY_TOKENS)?;
            table.insert(token.token.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read a recovery token without consuming it.
    pub fn get_recovery_token(&self, token: &str) -> DbResult<Option<RecoveryToken>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECOVERY_TOKENS)?;
        match table.get(token)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically consume a recovery token and replace the wallet's password
    /// material.
    ///
    /// Inside one write transaction: validate the token (present, unused,
    /// unexpired), mark it used, and rewrite the wallet with the new hash and
    /// salt. A second caller racing on the same token observes `used: true`
    /// and fails. The stored key ciphertext is left untouched.
    pub fn consume_recovery_token(
        &self,
        token: &str,
        new_password_hash: &str,
        new_password_salt: &str,
        now: DateTime<Utc>,
    ) -> DbResult<WalletRecord> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut tokens = write_txn.open_table(RECOVERY_TOKENS)?;
            let token_bytes = {
                let existing = tokens.get(token)?.ok_or(DbError::RecoveryTokenInvalid)?;
                existing.value().to_vec()
            };
            let mut recovery: RecoveryToken = serde_json::from_slice(&token_bytes)?;
            if !recovery.is_valid(now) {
                return Err(DbError::RecoveryTokenInvalid);
            }
            recovery.used = true;
            let token_json = serde_json::to_vec(&recovery)?;
            tokens.insert(token, token_json.as_slice())?;

            let mut wallets = write_txn.open_table(WALLETS)?;
            let wallet_id = recovery.wallet_id.to_string();
            let wallet_bytes = {
                let existing = wallets
                    .get(wallet_id.as_str())?
                    .ok_or_else(|| DbError::WalletNotFound(wallet_id.clone()))?;
                existing.value().to_vec()
            };
            let mut record: WalletRecord = serde_json::from_slice(&wallet_bytes)?;
            record.password_hash = new_password_hash.to_string();
            record.password_salt = new_password_salt.to_string();
            record.updated_at = now;
            let wallet_json = serde_json::to_vec(&record)?;
            wallets.insert(wallet_id.as_str(), wallet_json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(updated)
    }

    // =========================================================================
    // Audit log
    // =========================================================================

    /// Append an audit event.
    pub fn append_audit(&self, event: &AuditEvent) -> DbResult<()> {
        let json = serde_json::to_vec(event)?;
        let key = make_audit_key(event.timestamp, &event.event_id);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read the most recent audit events, newest last.
    pub fn recent_audit_events(&self, limit: usize) -> DbResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT)?;
        let mut events = Vec::new();
        for entry in table.iter()?.rev().take(limit) {
            let entry = entry?;
            let event: AuditEvent = serde_json::from_slice(entry.1.value())?;
            events.push(event);
        }
        events.reverse();
        Ok(events)
    }
}
