// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential vault: password hashing and private-key encryption.
//!
//! ## Scheme
//!
//! - Password hash: PBKDF2-HMAC-SHA512, 100,000 iterations, 16-byte salt,
//!   64-byte output. Verified in constant time via `ring::pbkdf2::verify`.
//! - Key encryption: AES-256-GCM with a 12-byte random nonce. The AEAD key is
//!   derived from the password with PBKDF2-HMAC-SHA512 over a SEPARATE salt
//!   (`kdf_salt`), so the stored password hash reveals nothing about the
//!   encryption key.
//!
//! All randomness comes from `ring::rand::SystemRandom`. Nothing in this
//! module logs, and no function ever returns or formats password bytes.

use std::num::NonZeroU32;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

/// PBKDF2 iteration count for both password hashing and key derivation.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes (password salt and KDF salt).
const SALT_LEN: usize = 16;

/// PBKDF2 password hash output length in bytes.
const HASH_LEN: usize = 64;

/// AES-256 key length in bytes.
const AEAD_KEY_LEN: usize = 32;

/// Recovery token length in bytes (hex-encoded on output).
const RECOVERY_TOKEN_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Password verification failed or the ciphertext failed authentication.
    #[error("invalid password")]
    InvalidPassword,

    /// A stored field was not valid hex or had the wrong length.
    #[error("malformed stored credential material: {0}")]
    Malformed(&'static str),

    /// The AEAD seal operation failed.
    #[error("encryption failure")]
    Encrypt,

    /// The system RNG refused to produce bytes.
    #[error("random generator failure")]
    Rng,
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Everything that must be persisted to later verify the password and
/// decrypt the private key. All fields are hex strings.
#[derive(Debug, Clone)]
pub struct EncryptedKeyMaterial {
    /// AES-256-GCM ciphertext with the 16-byte tag appended.
    pub ciphertext: String,
    /// 12-byte AEAD nonce.
    pub iv: String,
    /// Salt for deriving the AEAD key from the password.
    pub kdf_salt: String,
    /// PBKDF2-HMAC-SHA512 password hash.
    pub password_hash: String,
    /// Salt for the password hash.
    pub password_salt: String,
}

/// Password hash and salt pair, used when only the password changes
/// (recovery reset, where the ciphertext is left in place).
#[derive(Debug, Clone)]
pub struct PasswordMaterial {
    pub password_hash: String,
    pub password_salt: String,
}

/// Stateless crypto engine for the wallet store.
pub struct CredentialVault {
    rng: SystemRandom,
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVault {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn random_bytes(&self, len: usize) -> VaultResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.rng.fill(&mut buf).map_err(|_| VaultError::Rng)?;
        Ok(buf)
    }

    fn derive(&self, password: &str, salt: &[u8], out_len: usize) -> Vec<u8> {
        let mut out = vec![0u8; out_len];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA512,
            NonZeroU32::new(PBKDF2_ITERATIONS).unwrap(),
            salt,
            password.as_bytes(),
            &mut out,
        );
        out
    }

    /// Hash a password with a fresh salt.
    pub fn hash_password(&self, password: &str) -> VaultResult<PasswordMaterial> {
        let salt = self.random_bytes(SALT_LEN)?;
        let hash = self.derive(password, &salt, HASH_LEN);
        Ok(PasswordMaterial {
            password_hash: alloy::hex::encode(&hash),
            password_salt: alloy::hex::encode(&salt),
        })
    }

    /// Verify a password against a stored hash/salt pair.
    ///
    /// Constant-time via `ring::pbkdf2::verify`.
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash_hex: &str,
        stored_salt_hex: &str,
    ) -> VaultResult<()> {
        let hash = alloy::hex::decode(stored_hash_hex)
            .map_err(|_| VaultError::Malformed("password_hash"))?;
        let salt = alloy::hex::decode(stored_salt_hex)
            .map_err(|_| VaultError::Malformed("password_salt"))?;
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA512,
            NonZeroU32::new(PBKDF2_ITERATIONS).unwrap(),
            &salt,
            password.as_bytes(),
            &hash,
        )
        .map_err(|_| VaultError::InvalidPassword)
    }

    /// Encrypt a raw private key under a password.
    ///
    /// Produces fresh salts and nonce; also produces the password hash so the
    /// caller persists one coherent bundle.
    pub fn encrypt_private_key(
        &self,
        private_key: &[u8],
        password: &str,
    ) -> VaultResult<EncryptedKeyMaterial> {
        let kdf_salt = self.random_bytes(SALT_LEN)?;
        let nonce_bytes = self.random_bytes(NONCE_LEN)?;
        let aead_key = self.derive(password, &kdf_salt, AEAD_KEY_LEN);

        let unbound = UnboundKey::new(&AES_256_GCM, &aead_key)
            .map_err(|_| VaultError::Malformed("aead key"))?;
        let key = LessSafeKey::new(unbound);
        let nonce = Nonce::try_assume_unique_for_key(&nonce_bytes)
            .map_err(|_| VaultError::Malformed("nonce"))?;

        let mut in_out = private_key.to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Encrypt)?;

        let password_material = self.hash_password(password)?;
        Ok(EncryptedKeyMaterial {
            ciphertext: alloy::hex::encode(&in_out),
            iv: alloy::hex::encode(&nonce_bytes),
            kdf_salt: alloy::hex::encode(&kdf_salt),
            password_hash: password_material.password_hash,
            password_salt: password_material.password_salt,
        })
    }

    /// Verify the password and decrypt the stored private key.
    ///
    /// The password hash is checked first; only then is the AEAD key derived
    /// and the ciphertext opened. Both failure modes surface as
    /// [`VaultError::InvalidPassword`] so callers cannot tell them apart.
    pub fn decrypt_private_key(
        &self,
        password: &str,
        ciphertext_hex: &str,
        iv_hex: &str,
        kdf_salt_hex: &str,
        password_hash_hex: &str,
        password_salt_hex: &str,
    ) -> VaultResult<Vec<u8>> {
        self.verify_password(password, password_hash_hex, password_salt_hex)?;

        let kdf_salt = alloy::hex::decode(kdf_salt_hex)
            .map_err(|_| VaultError::Malformed("kdf_salt"))?;
        let nonce_bytes =
            alloy::hex::decode(iv_hex).map_err(|_| VaultError::Malformed("encryption_iv"))?;
        let mut in_out = alloy::hex::decode(ciphertext_hex)
            .map_err(|_| VaultError::Malformed("encrypted_private_key"))?;

        let aead_key = self.derive(password, &kdf_salt, AEAD_KEY_LEN);
        let unbound = UnboundKey::new(&AES_256_GCM, &aead_key)
            .map_err(|_| VaultError::Malformed("aead key"))?;
        let key = LessSafeKey::new(unbound);
        let nonce = Nonce::try_assume_unique_for_key(&nonce_bytes)
            .map_err(|_| VaultError::Malformed("encryption_iv"))?;

        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::InvalidPassword)?;
        Ok(plaintext.to_vec())
    }

    /// Generate a recovery token: 32 random bytes, hex-encoded.
    pub fn generate_recovery_token(&self) -> VaultResult<String> {
        let bytes = self.random_bytes(RECOVERY_TOKEN_LEN)?;
        Ok(alloy::hex::encode(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let vault = CredentialVault::new();
        let private_key = [0x42u8; 32];

        let material = vault
            .encrypt_private_key(&private_key, "Correct-Horse-1!")
            .unwrap();
        let recovered = vault
            .decrypt_private_key(
                "Correct-Horse-1!",
                &material.ciphertext,
                &material.iv,
                &material.kdf_salt,
                &material.password_hash,
                &material.password_salt,
            )
            .unwrap();
        assert_eq!(recovered, private_key);
    }

    #[test]
    fn wrong_password_never_decrypts() {
        let vault = CredentialVault::new();
        let material = vault
            .encrypt_private_key(&[0x01u8; 32], "Correct-Horse-1!")
            .unwrap();
        let err = vault
            .decrypt_private_key(
                "wrong-password",
                &material.ciphertext,
                &material.iv,
                &material.kdf_salt,
                &material.password_hash,
                &material.password_salt,
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidPassword));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let vault = CredentialVault::new();
        let material = vault
            .encrypt_private_key(&[0x07u8; 32], "Correct-Horse-1!")
            .unwrap();

        let mut bytes = alloy::hex::decode(&material.ciphertext).unwrap();
        bytes[0] ^= 0xFF;
        let tampered = alloy::hex::encode(&bytes);

        let err = vault
            .decrypt_private_key(
                "Correct-Horse-1!",
                &tampered,
                &material.iv,
                &material.kdf_salt,
                &material.password_hash,
                &material.password_salt,
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidPassword));
    }

    #[test]
    fn password_hash_differs_from_encryption_salt() {
        let vault = CredentialVault::new();
        let material = vault
            .encrypt_private_key(&[0x03u8; 32], "Correct-Horse-1!")
            .unwrap();
        assert_ne!(material.kdf_salt, material.password_salt);
    }

    #[test]
    fn verify_password_accepts_and_rejects() {
        let vault = CredentialVault::new();
        let material = vault.hash_password("S3cret!pass").unwrap();
        assert!(vault
            .verify_password("S3cret!pass", &material.password_hash, &material.password_salt)
            .is_ok());
        assert!(matches!(
            vault
                .verify_password("other", &material.password_hash, &material.password_salt)
                .unwrap_err(),
            VaultError::InvalidPassword
        ));
    }

    #[test]
    fn recovery_tokens_are_64_hex_chars_and_unique() {
        let vault = CredentialVault::new();
        let a = vault.generate_recovery_token().unwrap();
        let b = vault.generate_recovery_token().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
