//! # veriprice-crypto
//!
//! Cryptographic primitives used by the attested-update protocol.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing (data hashes, proof digests)
//! - [`ed25519`]: Ed25519 producer keys for signed attestation proofs

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
