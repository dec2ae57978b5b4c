// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Events are appended to the `audit` table in the wallet database. Events
//! carry wallet identifiers and addresses, never passwords, private keys, or
//! raw session/recovery tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Wallet lifecycle
    WalletCreated,

    // Auth events
    LoginSuccess,
    LoginFailure,
    SessionDestroyed,

    // Credential events
    PasswordChanged,
    PasswordReset,
    RecoveryRequested,

    // Key usage events
    PrivateKeyExported,
    MessageSigned,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Wallet the event concerns (if known).
    pub wallet_id: Option<String>,
    /// Lowercase wallet address (if known).
    pub address: Option<String>,
    /// Additional details as JSON. Must never contain secret material.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
}

impl AuditEvent {
    /// Create a new successful audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            wallet_id: None,
            address: None,
            details: None,
            success: true,
        }
    }

    /// Set the wallet ID.
    pub fn with_wallet(mut self, wallet_id: impl Into<String>) -> Self {
        self.wallet_id = Some(wallet_id.into());
        self
    }

    /// Set the wallet address (lowercased).
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into().to_lowercase());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed.
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}
