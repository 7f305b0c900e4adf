//! Symmetric encryption of configuration secrets.
//!
//! Ciphertexts are hex strings laid out as `nonce (12 bytes) || ciphertext || tag (16 bytes)`,
//! sealed with AES-256-GCM. A fresh nonce is drawn for every call.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key must be {KEY_LEN} hex-encoded bytes")]
    MalformedKey,
    #[error("Ciphertext is not valid hex or is truncated")]
    MalformedCiphertext,
    #[error("Ciphertext failed authentication")]
    Authentication,
    #[error("Decrypted value is not UTF-8")]
    NotUtf8,
    #[error("Random source unavailable: {0}")]
    Random(String),
    #[error("Encryption failed")]
    Seal,
    #[error("Key derivation failed")]
    Derivation,
}

/// A hex-encoded 256-bit key.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    /// Wraps a stored key, checking its shape.
    pub fn from_hex(hex_key: impl Into<String>) -> Result<Self, CryptoError> {
        let hex_key = hex_key.into();
        let bytes = hex::decode(&hex_key).map_err(|_| CryptoError::MalformedKey)?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::MalformedKey);
        }
        Ok(Self(hex_key))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        hex::decode(&self.0).map_err(|_| CryptoError::MalformedKey)
    }

    /// Derives an independent 256-bit subkey for `label` with HKDF-SHA256.
    ///
    /// The stored key encrypts secrets; anything else uses a derived subkey.
    pub fn derive(&self, label: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
        let ikm = self.to_bytes()?;
        let mut okm = [0u8; KEY_LEN];
        Hkdf::<Sha256>::new(None, &ikm)
            .expand(label, &mut okm)
            .map_err(|_| CryptoError::Derivation)?;
        Ok(okm)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

/// Stateless AES-256-GCM helper. The key always comes from the caller.
pub struct SecretVault;

impl SecretVault {
    pub fn generate_key() -> Result<KeyMaterial, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        getrandom::fill(&mut bytes).map_err(|e| CryptoError::Random(e.to_string()))?;
        Ok(KeyMaterial(hex::encode(bytes)))
    }

    pub fn encrypt(plaintext: &str, key: &KeyMaterial) -> Result<String, CryptoError> {
        let cipher = cipher_for(key)?;

        let mut nonce = [0u8; NONCE_LEN];
        getrandom::fill(&mut nonce).map_err(|e| CryptoError::Random(e.to_string()))?;

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Seal)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(hex::encode(out))
    }

    pub fn decrypt(hex_ciphertext: &str, key: &KeyMaterial) -> Result<String, CryptoError> {
        let cipher = cipher_for(key)?;

        let raw = hex::decode(hex_ciphertext).map_err(|_| CryptoError::MalformedCiphertext)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::MalformedCiphertext);
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);

        let plain = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)?;
        String::from_utf8(plain).map_err(|_| CryptoError::NotUtf8)
    }
}

fn cipher_for(key: &KeyMaterial) -> Result<Aes256Gcm, CryptoError> {
    let bytes = key.to_bytes()?;
    Aes256Gcm::new_from_slice(&bytes).map_err(|_| CryptoError::MalformedKey)
}
