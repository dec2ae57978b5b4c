// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::email::Mailer;
use crate::storage::WalletDatabase;
use crate::vault::CredentialVault;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<WalletDatabase>,
    vault: Arc<CredentialVault>,
    mailer: Arc<dyn Mailer>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: Arc<WalletDatabase>,
        vault: Arc<CredentialVault>,
        mailer: Arc<dyn Mailer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            vault,
            mailer,
            config,
        }
    }

    pub fn db(&self) -> &WalletDatabase {
        &self.db
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Owned handles for moving into `spawn_blocking` closures.
    pub fn vault_handle(&self) -> Arc<CredentialVault> {
        Arc::clone(&self.vault)
    }

    pub fn db_handle(&self) -> Arc<WalletDatabase> {
        Arc::clone(&self.db)
    }
}

#[cfg(test)]
impl AppState {
    /// Build a state over a temp-dir database with a recording mailer.
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        Self::for_tests_with_config(Config::default())
    }

    pub fn for_tests_with_config(config: Config) -> (Self, tempfile::TempDir) {
        let mailer = Arc::new(crate::email::RecordingMailer::new());
        Self::for_tests_with_mailer(mailer, config)
    }

    pub fn for_tests_with_mailer(
        mailer: Arc<crate::email::RecordingMailer>,
        config: Config,
    ) -> (Self, tempfile::TempDir) {
        let temp = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db = WalletDatabase::open(&temp.path().join("custodial.redb"))
            .expect("Failed to open database");
        let state = Self::new(
            Arc::new(db),
            Arc::new(CredentialVault::new()),
            mailer,
            Arc::new(config),
        );
        (state, temp)
    }
}
