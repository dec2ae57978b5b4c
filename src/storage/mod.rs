// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent storage for wallets, sessions, recovery tokens and the audit
//! log, backed by an embedded redb database.

pub mod audit;
pub mod records;
pub mod wallet_db;

pub use audit::{AuditEvent, AuditEventType};
pub use records::{RecoveryToken, Session, WalletInfo, WalletRecord};
pub use wallet_db::{DbError, DbResult, WalletDatabase};
