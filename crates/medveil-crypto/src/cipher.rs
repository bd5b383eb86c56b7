//! AES-256-GCM key handle and sealed payload format
//!
//! The server holds the only key. Clients that want ciphertext on the wire get
//! it from the server, so sealing protects payloads at the API edge and at rest
//! but not from the server operator.
//!
//! Every payload is bound to the session it was sealed for: the SHA-256 of the
//! session id is passed to AES-GCM as associated data, so a ciphertext only
//! opens under the session that produced it.

use crate::error::CryptoError;
use crate::short_digest;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Encryption scheme label carried in metadata
pub const ENCRYPTION_TYPE: &str = "aes-256-gcm";

/// Human-readable algorithm name
pub const ALGORITHM: &str = "AES-256-GCM";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Parameters describing a sealed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    /// Scheme label
    pub encryption_type: String,
    /// Algorithm name
    pub algorithm: String,
    /// Fingerprint of the sealing key
    pub key_id: String,
    /// When the payload was sealed
    pub timestamp: DateTime<Utc>,
    /// Size of the encoded ciphertext
    pub size_bytes: usize,
    /// Fingerprint of the session the payload is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_hash: Option<String>,
}

/// A sealed payload and its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    /// `base64(nonce || ciphertext)`
    pub ciphertext: String,
    /// Sealing parameters
    pub metadata: EncryptionMetadata,
}

/// Process-wide encryption key handle
///
/// Constructed once at startup and shared by reference. Cloning copies the
/// expanded key schedule.
#[derive(Clone)]
pub struct CipherContext {
    cipher: Aes256Gcm,
    key_id: String,
}

impl std::fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherContext")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl CipherContext {
    /// Build a context around a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
            key_id: short_digest(&key),
        }
    }

    /// Build a context from raw key bytes
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] unless exactly 32 bytes are given.
    pub fn from_key_bytes(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self {
            cipher,
            key_id: short_digest(key),
        })
    }

    /// Build a context from a base64-encoded key
    pub fn from_base64_key(encoded: &str) -> Result<Self, CryptoError> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CryptoError::InvalidKey("key is not valid base64".to_string()))?;
        Self::from_key_bytes(&key)
    }

    /// Generate a new random key, base64-encoded, for configuration files
    pub fn generate_key_base64() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        STANDARD.encode(key)
    }

    /// Fingerprint of the key (never the key itself)
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Seal a UTF-8 payload for `session_id` under a fresh random nonce
    pub fn seal(&self, plaintext: &str, session_id: &str) -> Result<Sealed, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = session_aad(session_id);
        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::Encryption)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        let encoded = STANDARD.encode(payload);

        let metadata = EncryptionMetadata {
            encryption_type: ENCRYPTION_TYPE.to_string(),
            algorithm: ALGORITHM.to_string(),
            key_id: self.key_id.clone(),
            timestamp: Utc::now(),
            size_bytes: encoded.len(),
            session_hash: Some(short_digest(session_id.as_bytes())),
        };

        Ok(Sealed {
            ciphertext: encoded,
            metadata,
        })
    }

    /// Open a payload sealed for `session_id`
    ///
    /// When metadata is supplied its `key_id` must name this context's key and
    /// its `session_hash`, if present, must name `session_id`.
    ///
    /// # Errors
    /// Fails on a foreign key or session, bad encoding, truncated input, a tag
    /// mismatch or a non-UTF-8 plaintext.
    pub fn open(
        &self,
        sealed: &str,
        metadata: Option<&EncryptionMetadata>,
        session_id: &str,
    ) -> Result<String, CryptoError> {
        if let Some(meta) = metadata {
            if meta.key_id != self.key_id {
                return Err(CryptoError::KeyMismatch {
                    expected: self.key_id.clone(),
                    found: meta.key_id.clone(),
                });
            }
            if let Some(hash) = &meta.session_hash {
                if *hash != short_digest(session_id.as_bytes()) {
                    return Err(CryptoError::SessionMismatch);
                }
            }
        }

        let bytes = STANDARD
            .decode(sealed.trim())
            .map_err(|_| CryptoError::InvalidEncoding)?;

        // A valid payload holds at least a nonce and a 16-byte tag.
        if bytes.len() < NONCE_LEN + 16 {
            return Err(CryptoError::Truncated);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let aad = session_aad(session_id);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}

fn session_aad(session_id: &str) -> Vec<u8> {
    Sha256::digest(session_id.as_bytes()).to_vec()
}
