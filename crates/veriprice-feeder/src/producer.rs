//! Attestation envelopes and proof signers.
//!
//! The producer encodes the quote with the canonical payload layout, stamps
//! the attestation time from its clock and asks a [`ProofSigner`] for a
//! proof over the envelope signing bytes. The verifier recomputes the same
//! bytes from the decoded envelope.

use std::sync::Arc;

use veriprice_crypto::blake3::attestation_binding;
use veriprice_crypto::ed25519::{SigningKey, VerifyingKey};
use veriprice_types::{AttestationEnvelope, PriceQuote, ProducerId, UnixSeconds};
use veriprice_wire::{encode_envelope, encode_payload, signing_bytes};

use crate::clock::Clock;
use crate::Result;

/// Produces the proof bytes of an envelope.
pub trait ProofSigner: Send + Sync {
    /// Short scheme name for logs.
    fn scheme(&self) -> &'static str;

    fn prove(&self, signing_bytes: &[u8]) -> Vec<u8>;
}

/// 32-byte keyed BLAKE3 binding digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSigner;

impl ProofSigner for DigestSigner {
    fn scheme(&self) -> &'static str {
        "digest-binding"
    }

    fn prove(&self, signing_bytes: &[u8]) -> Vec<u8> {
        attestation_binding(signing_bytes).to_vec()
    }
}

/// 64-byte Ed25519 signature.
#[derive(Clone)]
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Key the verifier must register for this producer.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("verifying_key", &self.key.verifying_key())
            .finish()
    }
}

impl ProofSigner for Ed25519Signer {
    fn scheme(&self) -> &'static str {
        "ed25519"
    }

    fn prove(&self, signing_bytes: &[u8]) -> Vec<u8> {
        self.key.sign(signing_bytes).to_bytes().to_vec()
    }
}

/// Bind `quote` to `producer_id` at `attested_at`.
pub fn attest(
    quote: &PriceQuote,
    producer_id: &ProducerId,
    attested_at: UnixSeconds,
    signer: &dyn ProofSigner,
) -> Result<AttestationEnvelope> {
    let payload = encode_payload(quote)?;
    let proof = signer.prove(&signing_bytes(producer_id, attested_at, &payload));
    Ok(AttestationEnvelope {
        producer_id: producer_id.clone(),
        attested_at,
        payload,
        proof,
    })
}

/// A producer identity with its signer and clock.
pub struct AttestationProducer {
    producer_id: ProducerId,
    signer: Box<dyn ProofSigner>,
    clock: Arc<dyn Clock>,
}

impl AttestationProducer {
    pub fn new(producer_id: ProducerId, signer: Box<dyn ProofSigner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            producer_id,
            signer,
            clock,
        }
    }

    pub fn producer_id(&self) -> &ProducerId {
        &self.producer_id
    }

    pub fn scheme(&self) -> &'static str {
        self.signer.scheme()
    }

    /// Attest `quote` as of now.
    pub fn attest(&self, quote: &PriceQuote) -> Result<AttestationEnvelope> {
        let envelope = attest(quote, &self.producer_id, self.clock.now(), self.signer.as_ref())?;
        tracing::debug!(
            producer = %self.producer_id,
            attested_at = envelope.attested_at,
            scheme = self.signer.scheme(),
            "quote attested"
        );
        Ok(envelope)
    }

    /// Attest `quote` and encode the envelope.
    pub fn attest_bytes(&self, quote: &PriceQuote) -> Result<Vec<u8>> {
        Ok(encode_envelope(&self.attest(quote)?)?)
    }
}

impl std::fmt::Debug for AttestationProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationProducer")
            .field("producer_id", &self.producer_id)
            .field("scheme", &self.signer.scheme())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use veriprice_verifier::{DigestBinding, Ed25519Proofs, ProofScheme};
    use veriprice_wire::{decode_envelope, decode_payload};

    fn p1() -> ProducerId {
        ProducerId::new("p1").expect("producer")
    }

    fn quote() -> PriceQuote {
        PriceQuote::new(200_000_000_000, 1_700_000_000, "coinbase").expect("quote")
    }

    #[test]
    fn test_attest_stamps_clock_time() {
        let clock = Arc::new(ManualClock::new(1_700_000_042));
        let producer = AttestationProducer::new(p1(), Box::new(DigestSigner), clock.clone());
        let envelope = producer.attest(&quote()).expect("attest");
        assert_eq!(envelope.attested_at, 1_700_000_042);
        assert_eq!(envelope.producer_id, p1());

        clock.advance(10);
        assert_eq!(producer.attest(&quote()).expect("attest").attested_at, 1_700_000_052);
    }

    #[test]
    fn test_envelope_round_trips_through_wire() {
        let producer = AttestationProducer::new(p1(), Box::new(DigestSigner), Arc::new(ManualClock::new(5)));
        let bytes = producer.attest_bytes(&quote()).expect("bytes");
        let envelope = decode_envelope(&bytes).expect("decode");
        let payload = decode_payload(&envelope.payload).expect("payload");
        assert_eq!(payload.price, 200_000_000_000);
        assert_eq!(payload.observed_at, 1_700_000_000);
        assert_eq!(payload.source, "coinbase");
    }

    #[test]
    fn test_digest_proof_accepted_by_verifier_scheme() {
        let envelope = attest(&quote(), &p1(), 9, &DigestSigner).expect("attest");
        let message = signing_bytes(&envelope.producer_id, envelope.attested_at, &envelope.payload);
        DigestBinding
            .verify(&envelope.producer_id, &message, &envelope.proof)
            .expect("digest proof");
    }

    #[test]
    fn test_ed25519_proof_accepted_by_verifier_scheme() {
        let signer = Ed25519Signer::new(SigningKey::from_bytes(&[3u8; 32]));
        let scheme = Ed25519Proofs::new().with_key(p1(), signer.verifying_key());
        let envelope = attest(&quote(), &p1(), 9, &signer).expect("attest");
        assert_eq!(envelope.proof.len(), 64);
        let message = signing_bytes(&envelope.producer_id, envelope.attested_at, &envelope.payload);
        scheme
            .verify(&envelope.producer_id, &message, &envelope.proof)
            .expect("signature");
    }

    #[test]
    fn test_proof_covers_attestation_time() {
        let a = attest(&quote(), &p1(), 9, &DigestSigner).expect("attest");
        let b = attest(&quote(), &p1(), 10, &DigestSigner).expect("attest");
        assert_eq!(a.payload, b.payload);
        assert_ne!(a.proof, b.proof);
    }
}
