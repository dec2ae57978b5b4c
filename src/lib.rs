// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial Wallet Server - Session & Credential Management Service
//!
//! This crate provides a custodial EVM wallet service: password-encrypted
//! private keys, bearer session tokens, password recovery flows, and gated
//! key export and message signing.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session-token authentication and extractors
//! - `vault` - Password hashing and private-key encryption (ring)
//! - `keys` - secp256k1 keypairs, addresses, EIP-191 signing
//! - `sessions` / `recovery` - Session and recovery-token lifecycles
//! - `storage` - Embedded redb database (wallets, sessions, tokens, audit)

pub mod api;
pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod keys;
pub mod models;
pub mod recovery;
pub mod sessions;
pub mod state;
pub mod storage;
pub mod vault;
