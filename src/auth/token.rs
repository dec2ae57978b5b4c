// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token extraction.
//!
//! A token may arrive through any of four transports, tried in order:
//! the `custodialSession` cookie, the `x-custodial-session` header, the
//! `sessionToken` query parameter, and (for handlers with JSON bodies) a
//! `sessionToken` body field. The first hit wins; later sources are ignored.
//!
//! Tokens are UUIDs or hex strings, so cookie and query parsing does not
//! need percent-decoding.

use axum::http::header::COOKIE;
use axum::http::request::Parts;

use crate::config::{SESSION_COOKIE, SESSION_HEADER, SESSION_QUERY_PARAM};

/// Which transport a token was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    Header,
    Query,
    Body,
}

/// A token and where it came from.
#[derive(Debug, Clone)]
pub struct ExtractedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Extract a session token from request parts (cookie, header, query).
///
/// Body extraction cannot happen here; handlers that accept a body merge it
/// with [`merge_body_token`].
pub fn extract_from_parts(parts: &Parts) -> Option<ExtractedToken> {
    if let Some(token) = cookie_token(parts) {
        return Some(ExtractedToken {
            token,
            source: TokenSource::Cookie,
        });
    }
    if let Some(token) = header_token(parts) {
        return Some(ExtractedToken {
            token,
            source: TokenSource::Header,
        });
    }
    if let Some(token) = query_token(parts) {
        return Some(ExtractedToken {
            token,
            source: TokenSource::Query,
        });
    }
    None
}

/// Combine a parts-level token with an optional body token. The body is the
/// lowest-priority source.
pub fn merge_body_token(
    from_parts: Option<ExtractedToken>,
    body_token: Option<&str>,
) -> Option<ExtractedToken> {
    from_parts.or_else(|| {
        body_token
            .filter(|t| !t.is_empty())
            .map(|t| ExtractedToken {
                token: t.to_string(),
                source: TokenSource::Body,
            })
    })
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    for pair in header.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn header_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(SESSION_HEADER)?.to_str().ok()?;
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn query_token(parts: &Parts) -> Option<String> {
    let query = parts.uri.query()?;
    for pair in query.split('&') {
        if let Some((name, value)) = pair.split_once('=') {
            if name == SESSION_QUERY_PARAM && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
