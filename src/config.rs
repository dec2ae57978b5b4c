// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! `Config` struct loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the wallet database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `APP_URL` | Public base URL used in recovery links | `http://localhost:8080` |
//! | `SMTP_FROM` | From address for outgoing mail | `no-reply@localhost` |
//! | `TEST_WALLET_ENABLED` | Enable the synthetic test wallet identity | unset (disabled) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

/// Environment variable name for the data directory path.
///
/// The wallet database (`custodial.redb`) is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable enabling the synthetic test wallet.
///
/// When set to `true` (or `1`), requests targeting [`TEST_WALLET_ADDRESS`]
/// resolve to an always-valid synthetic session. This exists for integration
/// testing against a running instance and MUST stay unset in production.
pub const TEST_WALLET_ENABLED_ENV: &str = "TEST_WALLET_ENABLED";

/// Fixed address of the synthetic test wallet (lowercase).
pub const TEST_WALLET_ADDRESS: &str = "0xc2dd65af9fed4a01fb8764d65c591077f02c6497";

/// Fixed bearer token accepted for the synthetic test wallet.
pub const TEST_WALLET_SESSION_TOKEN: &str = "test-session-token-123456789";

/// Cookie carrying the custodial session token.
pub const SESSION_COOKIE: &str = "custodialSession";

/// Custom header carrying the custodial session token.
pub const SESSION_HEADER: &str = "x-custodial-session";

/// Query parameter carrying the custodial session token.
///
/// Tokens in query strings can leak via access logs and referrers; this
/// source is kept for client compatibility and should be the first one
/// dropped in a hardening pass.
pub const SESSION_QUERY_PARAM: &str = "sessionToken";

/// Runtime configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for persistent storage.
    pub data_dir: PathBuf,
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Public base URL used when building recovery links.
    pub app_url: String,
    /// From address for outgoing mail.
    pub smtp_from: String,
    /// Whether the synthetic test wallet identity is reachable.
    pub test_wallet_enabled: bool,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let data_dir = env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/data"));

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let app_url = env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let smtp_from = env::var("SMTP_FROM").unwrap_or_else(|_| "no-reply@localhost".to_string());

        let test_wallet_enabled = env::var(TEST_WALLET_ENABLED_ENV)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            data_dir,
            host,
            port,
            app_url,
            smtp_from,
            test_wallet_enabled,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data"),
            host: "0.0.0.0".to_string(),
            port: 8080,
            app_url: "http://localhost:8080".to_string(),
            smtp_from: "no-reply@localhost".to_string(),
            test_wallet_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_test_wallet() {
        let config = Config::default();
        assert!(!config.test_wallet_enabled);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_wallet_address_is_lowercase() {
        assert_eq!(TEST_WALLET_ADDRESS, TEST_WALLET_ADDRESS.to_lowercase());
    }
}
