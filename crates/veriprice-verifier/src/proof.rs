//! Pluggable attestation proof schemes.
//!
//! The verifier treats a proof as opaque bytes and hands it to a
//! [`ProofScheme`] together with the producer id and the signing bytes
//! recomputed from the decoded envelope. Two schemes ship:
//!
//! - [`DigestBinding`]: a keyed BLAKE3 digest of the signing bytes. It
//!   checks shape and binding only; anyone can compute it.
//! - [`Ed25519Proofs`]: an Ed25519 signature by a key registered for the
//!   producer id.

use std::collections::BTreeMap;

use veriprice_crypto::blake3::attestation_binding;
use veriprice_crypto::ed25519::{Signature, VerifyingKey};
use veriprice_types::ProducerId;

/// Length of a [`DigestBinding`] proof.
pub const DIGEST_PROOF_LEN: usize = 32;

/// Checks an attestation proof.
pub trait ProofScheme: Send + Sync {
    /// Short scheme name for logs.
    fn name(&self) -> &'static str;

    /// Accept or reject `proof` for `signing_bytes` from `producer_id`.
    ///
    /// The error string becomes part of the rejection reason.
    fn verify(
        &self,
        producer_id: &ProducerId,
        signing_bytes: &[u8],
        proof: &[u8],
    ) -> Result<(), String>;
}

/// Placeholder binding: the proof must equal the binding digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestBinding;

impl ProofScheme for DigestBinding {
    fn name(&self) -> &'static str {
        "digest-binding"
    }

    fn verify(&self, _producer_id: &ProducerId, signing_bytes: &[u8], proof: &[u8]) -> Result<(), String> {
        if proof.len() != DIGEST_PROOF_LEN {
            return Err(format!(
                "expected {DIGEST_PROOF_LEN}-byte digest, got {} bytes",
                proof.len()
            ));
        }
        if proof != attestation_binding(signing_bytes).as_slice() {
            return Err("digest does not bind envelope contents".to_string());
        }
        Ok(())
    }
}

/// Ed25519 signatures by per-producer keys.
#[derive(Debug, Clone, Default)]
pub struct Ed25519Proofs {
    keys: BTreeMap<ProducerId, VerifyingKey>,
}

impl Ed25519Proofs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the key for a producer.
    pub fn with_key(mut self, producer_id: ProducerId, key: VerifyingKey) -> Self {
        self.keys.insert(producer_id, key);
        self
    }
}

impl ProofScheme for Ed25519Proofs {
    fn name(&self) -> &'static str {
        "ed25519"
    }

    fn verify(&self, producer_id: &ProducerId, signing_bytes: &[u8], proof: &[u8]) -> Result<(), String> {
        let key = self
            .keys
            .get(producer_id)
            .ok_or_else(|| format!("no key registered for producer {producer_id}"))?;
        let signature = Signature::from_slice(proof).map_err(|e| e.to_string())?;
        key.verify(signing_bytes, &signature).map_err(|e| e.to_string())
    }
}
