//! Error types for encryption and attestation

use thiserror::Error;

/// Errors from the encryption adapter
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material has the wrong size or encoding
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Payload was sealed under a different key
    #[error("Key mismatch: payload sealed with key {found}, server key is {expected}")]
    KeyMismatch {
        /// Fingerprint of the server key
        expected: String,
        /// Fingerprint named in the payload metadata
        found: String,
    },

    /// Payload metadata names a different session
    #[error("Session mismatch: payload was sealed for another session")]
    SessionMismatch,

    /// Payload is not valid base64
    #[error("Invalid ciphertext encoding")]
    InvalidEncoding,

    /// Payload is too short to contain a nonce and tag
    #[error("Ciphertext truncated")]
    Truncated,

    /// Authentication tag did not verify
    #[error("Decryption failed: authentication tag mismatch")]
    Authentication,

    /// Encryption primitive failed
    #[error("Encryption failed")]
    Encryption,

    /// Plaintext is not UTF-8
    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors from the attestation service
#[derive(Error, Debug)]
pub enum AttestationError {
    /// Proof payload could not be decoded
    #[error("Invalid attestation proof: {0}")]
    InvalidProof(String),

    /// Remote attestation endpoint unreachable
    #[error("Attestation fetch failed: {0}")]
    Remote(String),

    /// Remote attestation endpoint answered with an error status
    #[error("Attestation endpoint returned HTTP {status}: {body}")]
    RemoteStatus {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
