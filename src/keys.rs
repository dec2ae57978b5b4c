// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 keypair generation, Ethereum address derivation, and
//! EIP-191 personal-message signing.
//!
//! Private keys are handled as raw 32-byte scalars. They exist in plaintext
//! only transiently, between vault decryption and signing or export.

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::OsRng;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid private key bytes")]
    InvalidKey,

    #[error("signing failed: {0}")]
    Signing(String),
}

/// A freshly generated wallet keypair.
pub struct GeneratedKeypair {
    /// Raw 32-byte private key scalar.
    pub private_key: Vec<u8>,
    /// Lowercase 0x-prefixed Ethereum address (42 chars).
    pub address: String,
}

/// Generate a random secp256k1 keypair and derive its Ethereum address.
pub fn generate_keypair() -> Result<GeneratedKeypair, KeyError> {
    let signing_key = SigningKey::random(&mut OsRng);
    let private_key = signing_key.to_bytes().to_vec();

    let signer = PrivateKeySigner::from_slice(&private_key).map_err(|_| KeyError::InvalidKey)?;
    let address = format!("0x{}", alloy::hex::encode(signer.address().as_slice()));

    Ok(GeneratedKeypair {
        private_key,
        address,
    })
}

/// Build a signer from raw private key bytes.
pub fn signer_from_bytes(private_key: &[u8]) -> Result<PrivateKeySigner, KeyError> {
    PrivateKeySigner::from_slice(private_key).map_err(|_| KeyError::InvalidKey)
}

/// Derive the lowercase Ethereum address for raw private key bytes.
pub fn address_for_key(private_key: &[u8]) -> Result<String, KeyError> {
    let signer = signer_from_bytes(private_key)?;
    Ok(format!(
        "0x{}",
        alloy::hex::encode(signer.address().as_slice())
    ))
}

/// Sign a message under the EIP-191 personal-message scheme.
///
/// Returns the 65-byte signature as a 0x-prefixed hex string.
pub fn sign_personal_message(private_key: &[u8], message: &str) -> Result<String, KeyError> {
    let signer = signer_from_bytes(private_key)?;
    let signature = signer
        .sign_message_sync(message.as_bytes())
        .map_err(|e| KeyError::Signing(e.to_string()))?;
    Ok(format!("0x{}", alloy::hex::encode(signature.as_bytes())))
}

/// Format raw private key bytes for export: 0x-prefixed hex.
pub fn export_format(private_key: &[u8]) -> String {
    format!("0x{}", alloy::hex::encode(private_key))
}
