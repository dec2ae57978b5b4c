// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-based authentication: token extraction, the per-request
//! resolution algorithm, and the axum extractors built on it.

pub mod error;
pub mod extractor;
pub mod identity;
pub mod token;

pub use error::AuthError;
pub use extractor::{authenticate, ReadOnlyAuth, WalletAuth};
pub use identity::{AuthenticatedWallet, Identity};
pub use token::{extract_from_parts, merge_body_token, ExtractedToken, TokenSource};
