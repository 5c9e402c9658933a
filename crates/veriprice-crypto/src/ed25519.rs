//! Ed25519 producer keys (RFC 8032).
//!
//! A producer that holds a [`SigningKey`] signs the attestation signing
//! bytes; the verifier checks the signature against the [`VerifyingKey`]
//! registered for that producer id. Secret material is zeroized on drop by
//! `ed25519-dalek`; seeds decoded here are held in [`Zeroizing`] buffers.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Length of an encoded signature.
pub const SIGNATURE_LEN: usize = 64;

/// Length of a seed or public key.
pub const KEY_LEN: usize = 32;

/// A producer's secret signing key.
#[derive(Clone)]
pub struct SigningKey(ed25519_dalek::SigningKey);

/// A producer's public key, as registered with the verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// A detached signature over attestation signing bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

fn key_array(bytes: &[u8]) -> Result<&[u8; KEY_LEN]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LEN,
        actual: bytes.len(),
    })
}

impl SigningKey {
    /// Fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Key from a 32-byte seed.
    pub fn from_bytes(seed: &[u8; KEY_LEN]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Key from a hex-encoded 32-byte seed.
    pub fn from_hex_seed(text: &str) -> Result<Self> {
        let seed = Zeroizing::new(
            hex::decode(text.trim()).map_err(|e| CryptoError::InvalidInput(e.to_string()))?,
        );
        Ok(Self::from_bytes(key_array(&seed)?))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message))
    }
}

impl VerifyingKey {
    /// Parse a public key, rejecting points that are not on the curve.
    pub fn from_bytes(bytes: &[u8; KEY_LEN]) -> Result<Self> {
        ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim()).map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        Self::from_bytes(key_array(&bytes)?)
    }

    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.0.to_bytes()
    }

    /// Strict verification: small-order keys and malleable signatures fail.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    /// Parse a proof field as a signature.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        ed25519_dalek::Signature::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: SIGNATURE_LEN,
                actual: bytes.len(),
            })
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0.to_bytes()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningKey")
            .field(&hex::encode(self.verifying_key().to_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = b"producer p1 signing bytes";

    #[test]
    fn test_signature_verifies_under_own_key() {
        let key = SigningKey::generate();
        let sig = key.sign(MESSAGE);
        key.verifying_key().verify(MESSAGE, &sig).expect("valid signature");
    }

    #[test]
    fn test_altered_message_rejected() {
        let key = SigningKey::from_bytes(&[1u8; 32]);
        let sig = key.sign(MESSAGE);
        assert!(key.verifying_key().verify(b"producer p2 signing bytes", &sig).is_err());
    }

    #[test]
    fn test_other_producer_key_rejected() {
        let sig = SigningKey::from_bytes(&[1u8; 32]).sign(MESSAGE);
        let other = SigningKey::from_bytes(&[2u8; 32]).verifying_key();
        assert!(other.verify(MESSAGE, &sig).is_err());
    }

    #[test]
    fn test_signature_length_checked() {
        assert!(matches!(
            Signature::from_slice(&[0u8; 63]),
            Err(CryptoError::InvalidKeyLength { actual: 63, .. })
        ));
        let sig = SigningKey::from_bytes(&[7u8; 32]).sign(MESSAGE);
        assert_eq!(Signature::from_slice(&sig.to_bytes()).expect("64 bytes"), sig);
    }

    #[test]
    fn test_hex_seed_and_public_key() {
        let key = SigningKey::from_hex_seed(&"42".repeat(32)).expect("seed");
        assert_eq!(key.verifying_key(), SigningKey::from_bytes(&[0x42; 32]).verifying_key());

        let vk = key.verifying_key();
        assert_eq!(VerifyingKey::from_hex(&hex::encode(vk.to_bytes())).expect("hex"), vk);
        assert!(VerifyingKey::from_hex("abcd").is_err());
        assert!(SigningKey::from_hex_seed("zz").is_err());
        assert!(SigningKey::from_hex_seed(&"42".repeat(31)).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains(&hex::encode(key.verifying_key().to_bytes())));
        assert!(!rendered.contains(&"09".repeat(32)));
    }
}
