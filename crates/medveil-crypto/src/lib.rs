//! MedVeil Crypto
//!
//! Encryption adapter and attestation handling.
//!
//! # Encryption
//!
//! [`CipherContext`] is the process-wide key handle. It is constructed once at
//! startup and borrowed by every request; there is no module-level key.
//! Payloads are sealed with AES-256-GCM and exchanged as
//! `base64(nonce || ciphertext)`, bound to a session id through the AEAD
//! associated data.
//!
//! # Attestation
//!
//! [`AttestationService`] produces a local self-report or passes a remote
//! report through. Verification is integrity-only: it recomputes the report
//! digest, compares measurements against configured values and checks
//! freshness. No hardware signature is checked, and results say so.
//!
//! # Examples
//!
//! ```
//! use medveil_crypto::CipherContext;
//!
//! let ctx = CipherContext::generate();
//! let sealed = ctx.seal("chest pain since Tuesday", "session-1").unwrap();
//! let opened = ctx
//!     .open(&sealed.ciphertext, Some(&sealed.metadata), "session-1")
//!     .unwrap();
//! assert_eq!(opened, "chest pain since Tuesday");
//! ```

#![warn(missing_docs)]

pub mod attestation;
pub mod cipher;
mod error;

pub use attestation::{
    AttestationConfig, AttestationDocument, AttestationProof, AttestationService,
    AttestationStatus, ProofSource, TrustLevel, VerificationChecks, VerificationOutcome,
};
pub use cipher::{CipherContext, EncryptionMetadata, Sealed};
pub use error::{AttestationError, CryptoError};

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `data`, truncated to 16 characters
pub fn short_digest(data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_digest_is_stable() {
        assert_eq!(short_digest(b"abc"), "ba7816bf8f01cfea");
        assert_eq!(short_digest(b"abc").len(), 16);
    }
}
