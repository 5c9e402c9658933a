//! Update validation and commit.
//!
//! [`Verifier::update_price`] runs its checks in a fixed order against an
//! immutable view of the state, then commits with a single assignment. A
//! failing check returns before anything is written, so a rejected call is
//! indistinguishable from no call at all.
//!
//! ## Check order
//!
//! 1. caller is an authorized submitter
//! 2. price is non-zero and the observation is not from the future
//! 3. observation is within `max_age`
//! 4. envelope decodes
//! 5. payload price and timestamp equal the call parameters
//! 6. attestation is within `attestation_freshness`, and its proof passes
//!    the proof scheme
//! 7. producer is authorized
//! 8. record is overwritten with the new data hash
//! 9. alert thresholds are evaluated
//! 10. `Updated` is emitted

use tracing::{debug, info};
use veriprice_types::events::VerifierEvent;
use veriprice_types::{
    Address, LatestRecord, Price, ProducerId, ThresholdConfig, UnixSeconds, ATTESTATION_FRESHNESS_SECS,
    MAX_AGE_SECS, MAX_CLOCK_SKEW_SECS,
};
use veriprice_wire::{decode_envelope, decode_payload, signing_bytes};

use crate::hash::price_data_hash;
use crate::proof::{DigestBinding, ProofScheme};
use crate::registry::Registry;
use crate::threshold;
use crate::{AttestationFault, Result, VerifierError};

/// Who is calling and at what host time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: UnixSeconds,
}

impl CallContext {
    pub fn new(caller: Address, now: UnixSeconds) -> Self {
        Self { caller, now }
    }
}

/// Freshness windows enforced by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierParams {
    /// Maximum age of an observation in seconds.
    pub max_age: u64,
    /// Maximum age of an attestation in seconds.
    pub attestation_freshness: u64,
    /// Tolerated drift for timestamps ahead of the host clock.
    pub max_clock_skew: u64,
}

impl Default for VerifierParams {
    fn default() -> Self {
        Self {
            max_age: MAX_AGE_SECS,
            attestation_freshness: ATTESTATION_FRESHNESS_SECS,
            max_clock_skew: MAX_CLOCK_SKEW_SECS,
        }
    }
}

/// Everything the verifier owns and mutates.
#[derive(Debug, Clone)]
pub struct VerifierState {
    pub latest: Option<LatestRecord>,
    pub registry: Registry,
}

/// Result of an accepted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReceipt {
    /// The record as committed.
    pub record: LatestRecord,
    /// Events emitted by this call, in emission order.
    pub events: Vec<VerifierEvent>,
}

/// The authoritative price record and its guard rails.
pub struct Verifier {
    state: VerifierState,
    params: VerifierParams,
    proofs: Box<dyn ProofScheme>,
    journal: Vec<VerifierEvent>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("state", &self.state)
            .field("params", &self.params)
            .field("proofs", &self.proofs.name())
            .finish()
    }
}

impl Verifier {
    /// Empty verifier owned by `owner` using the digest-binding proof scheme.
    pub fn new(owner: Address, params: VerifierParams) -> Self {
        Self {
            state: VerifierState {
                latest: None,
                registry: Registry::new(owner),
            },
            params,
            proofs: Box::new(DigestBinding),
            journal: Vec::new(),
        }
    }

    /// Replace the proof scheme.
    pub fn with_proof_scheme(mut self, proofs: Box<dyn ProofScheme>) -> Self {
        self.proofs = proofs;
        self
    }

    pub fn params(&self) -> VerifierParams {
        self.params
    }

    pub fn state(&self) -> &VerifierState {
        &self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    /// Validate an attested observation and commit it.
    ///
    /// # Errors
    ///
    /// Any [`VerifierError`] except `InvalidThresholdRange`, `UnauthorizedCaller`
    /// and `NoPriceData`. On error the state is untouched.
    pub fn update_price(
        &mut self,
        ctx: &CallContext,
        price: Price,
        observed_at: UnixSeconds,
        attestation: &[u8],
    ) -> Result<UpdateReceipt> {
        let producer_id = match self.validate(ctx, price, observed_at, attestation) {
            Ok(producer_id) => producer_id,
            Err(e) => {
                debug!(caller = %ctx.caller, price, observed_at, reason = %e, "update rejected");
                return Err(e);
            }
        };

        let record = LatestRecord {
            price,
            observed_at,
            submitter: ctx.caller,
            data_hash: price_data_hash(price, observed_at, &producer_id),
        };
        self.state.latest = Some(record.clone());

        let mut events = Vec::with_capacity(2);
        if let Some(breach) = threshold::evaluate(&self.state.registry.thresholds(), price) {
            events.push(breach);
        }
        events.push(VerifierEvent::Updated {
            price,
            observed_at,
            submitter: ctx.caller,
            producer_id: producer_id.clone(),
        });
        self.journal.extend(events.iter().cloned());

        info!(price, observed_at, submitter = %ctx.caller, producer = %producer_id, "price updated");
        Ok(UpdateReceipt { record, events })
    }

    /// Run every check of `update_price` without mutating anything.
    ///
    /// Returns the attesting producer on success.
    fn validate(
        &self,
        ctx: &CallContext,
        price: Price,
        observed_at: UnixSeconds,
        attestation: &[u8],
    ) -> Result<ProducerId> {
        let registry = &self.state.registry;
        let now = ctx.now;

        if !registry.is_submitter_authorized(&ctx.caller) {
            return Err(VerifierError::UnauthorizedSubmitter(ctx.caller));
        }

        if price == 0 {
            return Err(VerifierError::InvalidPriceData("price is zero"));
        }
        if observed_at > now.saturating_add(self.params.max_clock_skew) {
            return Err(VerifierError::InvalidPriceData("observed in the future"));
        }

        if now > observed_at.saturating_add(self.params.max_age) {
            return Err(VerifierError::PriceTooOld {
                observed_at,
                now,
                max_age: self.params.max_age,
            });
        }

        let envelope = decode_envelope(attestation).map_err(AttestationFault::from)?;
        let payload = decode_payload(&envelope.payload).map_err(AttestationFault::from)?;

        if payload.price != price || payload.observed_at != observed_at {
            return Err(AttestationFault::PayloadMismatch {
                attested_price: payload.price,
                attested_observed_at: payload.observed_at,
                price,
                observed_at,
            }
            .into());
        }

        if envelope.attested_at > now.saturating_add(self.params.max_clock_skew) {
            return Err(AttestationFault::FromFuture {
                attested_at: envelope.attested_at,
                now,
            }
            .into());
        }
        if now > envelope.attested_at.saturating_add(self.params.attestation_freshness) {
            return Err(AttestationFault::Stale {
                attested_at: envelope.attested_at,
                now,
                window: self.params.attestation_freshness,
            }
            .into());
        }

        let message = signing_bytes(&envelope.producer_id, envelope.attested_at, &envelope.payload);
        self.proofs
            .verify(&envelope.producer_id, &message, &envelope.proof)
            .map_err(AttestationFault::Proof)?;

        if !registry.is_producer_authorized(&envelope.producer_id) {
            return Err(VerifierError::UnauthorizedProducer(envelope.producer_id));
        }

        Ok(envelope.producer_id)
    }

    /// Latest committed `(price, observed_at)`.
    pub fn latest_price(&self) -> Result<(Price, UnixSeconds)> {
        self.state
            .latest
            .as_ref()
            .map(|r| (r.price, r.observed_at))
            .ok_or(VerifierError::NoPriceData)
    }

    /// Latest committed record.
    pub fn latest_price_data(&self) -> Result<LatestRecord> {
        self.state.latest.clone().ok_or(VerifierError::NoPriceData)
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.state.registry.thresholds()
    }

    pub fn set_thresholds(
        &mut self,
        ctx: &CallContext,
        upper: Price,
        lower: Price,
        enabled: bool,
    ) -> Result<VerifierEvent> {
        let event = self
            .state
            .registry
            .set_thresholds(ctx.caller, upper, lower, enabled)?;
        self.journal.push(event.clone());
        Ok(event)
    }

    pub fn set_producer_authorization(
        &mut self,
        ctx: &CallContext,
        producer_id: ProducerId,
        authorized: bool,
    ) -> Result<VerifierEvent> {
        let event = self
            .state
            .registry
            .set_producer_authorization(ctx.caller, producer_id, authorized)?;
        self.journal.push(event.clone());
        Ok(event)
    }

    pub fn set_submitter_authorization(
        &mut self,
        ctx: &CallContext,
        submitter: Address,
        authorized: bool,
    ) -> Result<VerifierEvent> {
        let event = self
            .state
            .registry
            .set_submitter_authorization(ctx.caller, submitter, authorized)?;
        self.journal.push(event.clone());
        Ok(event)
    }

    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<VerifierEvent> {
        let event = self.state.registry.transfer_ownership(ctx.caller, new_owner)?;
        self.journal.push(event.clone());
        Ok(event)
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<VerifierEvent> {
        std::mem::take(&mut self.journal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::Ed25519Proofs;
    use crate::RejectionKind;
    use veriprice_crypto::blake3::attestation_binding;
    use veriprice_crypto::ed25519::SigningKey;
    use veriprice_types::events::BreachSide;
    use veriprice_types::{AttestationEnvelope, PriceQuote, PRICE_SCALE};
    use veriprice_wire::{encode_envelope, encode_payload};

    const OWNER: Address = Address([0x0A; 20]);
    const SUBMITTER: Address = Address([0xA1; 20]);
    const STRANGER: Address = Address([0xB2; 20]);
    const NOW: UnixSeconds = 1_700_000_000;

    fn p1() -> ProducerId {
        ProducerId::new("p1").expect("producer")
    }

    fn owner_ctx() -> CallContext {
        CallContext::new(OWNER, NOW)
    }

    fn submitter_ctx() -> CallContext {
        CallContext::new(SUBMITTER, NOW)
    }

    fn verifier() -> Verifier {
        let mut v = Verifier::new(OWNER, VerifierParams::default());
        v.set_producer_authorization(&owner_ctx(), p1(), true)
            .expect("authorize producer");
        v.set_submitter_authorization(&owner_ctx(), SUBMITTER, true)
            .expect("authorize submitter");
        v.drain_events();
        v
    }

    fn envelope_with(
        producer: &str,
        price: Price,
        observed_at: UnixSeconds,
        attested_at: UnixSeconds,
    ) -> AttestationEnvelope {
        let producer_id = ProducerId::new(producer).expect("producer");
        let quote = PriceQuote::new(price, observed_at, "test").expect("quote");
        let payload = encode_payload(&quote).expect("payload");
        let proof = attestation_binding(&signing_bytes(&producer_id, attested_at, &payload)).to_vec();
        AttestationEnvelope {
            producer_id,
            attested_at,
            payload,
            proof,
        }
    }

    fn attestation(price: Price, observed_at: UnixSeconds) -> Vec<u8> {
        encode_envelope(&envelope_with("p1", price, observed_at, NOW)).expect("encode")
    }

    #[test]
    fn test_valid_update_commits_record() {
        let mut v = verifier();
        let price = 2_000 * PRICE_SCALE;
        let receipt = v
            .update_price(&submitter_ctx(), price, NOW, &attestation(price, NOW))
            .expect("accepted");

        let expected = LatestRecord {
            price,
            observed_at: NOW,
            submitter: SUBMITTER,
            data_hash: price_data_hash(price, NOW, &p1()),
        };
        assert_eq!(receipt.record, expected);
        assert_eq!(v.latest_price_data().expect("record"), expected);
        assert_eq!(v.latest_price().expect("price"), (price, NOW));

        let updated: Vec<_> = receipt
            .events
            .iter()
            .filter(|e| matches!(e, VerifierEvent::Updated { .. }))
            .collect();
        assert_eq!(updated.len(), 1);
        assert_eq!(v.drain_events(), receipt.events);
    }

    #[test]
    fn test_empty_verifier_has_no_price() {
        let v = verifier();
        assert_eq!(v.latest_price(), Err(VerifierError::NoPriceData));
        assert_eq!(v.latest_price_data(), Err(VerifierError::NoPriceData));
    }

    #[test]
    fn test_unauthorized_submitter() {
        let mut v = verifier();
        let price = 2_000 * PRICE_SCALE;
        let err = v
            .update_price(&CallContext::new(STRANGER, NOW), price, NOW, &attestation(price, NOW))
            .expect_err("stranger");
        assert_eq!(err, VerifierError::UnauthorizedSubmitter(STRANGER));
        assert!(v.state().latest.is_none());
        assert!(v.drain_events().is_empty());
    }

    #[test]
    fn test_submitter_checked_before_everything() {
        let mut v = verifier();
        let err = v
            .update_price(&CallContext::new(STRANGER, NOW), 0, 0, b"garbage")
            .expect_err("stranger");
        assert_eq!(err.kind(), RejectionKind::UnauthorizedSubmitter);
    }

    #[test]
    fn test_zero_price() {
        let mut v = verifier();
        let err = v
            .update_price(&submitter_ctx(), 0, NOW, &attestation(1, NOW))
            .expect_err("zero");
        assert_eq!(err.kind(), RejectionKind::InvalidPriceData);
    }

    #[test]
    fn test_future_observation() {
        let mut v = verifier();
        let observed = NOW + MAX_CLOCK_SKEW_SECS + 1;
        let err = v
            .update_price(&submitter_ctx(), 5, observed, &attestation(5, observed))
            .expect_err("future");
        assert_eq!(err, VerifierError::InvalidPriceData("observed in the future"));
    }

    #[test]
    fn test_staleness_boundary() {
        let mut v = verifier();
        let price = 2_000 * PRICE_SCALE;

        let too_old = NOW - 3601;
        let err = v
            .update_price(&submitter_ctx(), price, too_old, &attestation(price, too_old))
            .expect_err("too old");
        assert_eq!(
            err,
            VerifierError::PriceTooOld {
                observed_at: too_old,
                now: NOW,
                max_age: 3600
            }
        );

        let fresh = NOW - 3599;
        v.update_price(&submitter_ctx(), price, fresh, &attestation(price, fresh))
            .expect("within max age");

        let exact = NOW - 3600;
        v.update_price(&submitter_ctx(), price, exact, &attestation(price, exact))
            .expect("boundary is inclusive");
    }

    #[test]
    fn test_malformed_attestation() {
        let mut v = verifier();
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, b"\x01garbage")
            .expect_err("garbage");
        assert!(matches!(
            err,
            VerifierError::InvalidAttestation(AttestationFault::Malformed(_))
        ));
    }

    #[test]
    fn test_payload_mismatch_rejected_without_mutation() {
        let mut v = verifier();
        let price = 2_000 * PRICE_SCALE;
        v.update_price(&submitter_ctx(), price, NOW, &attestation(price, NOW))
            .expect("first update");
        let before = v.latest_price_data().expect("record");
        v.drain_events();

        // Valid envelope for one price replayed against another.
        let err = v
            .update_price(&submitter_ctx(), price + 1, NOW, &attestation(price, NOW))
            .expect_err("price mismatch");
        assert!(matches!(
            err,
            VerifierError::InvalidAttestation(AttestationFault::PayloadMismatch { .. })
        ));

        let err = v
            .update_price(&submitter_ctx(), price, NOW - 1, &attestation(price, NOW))
            .expect_err("timestamp mismatch");
        assert_eq!(err.kind(), RejectionKind::InvalidAttestation);

        assert_eq!(v.latest_price_data().expect("record"), before);
        assert!(v.drain_events().is_empty());
    }

    #[test]
    fn test_stale_attestation() {
        let mut v = verifier();
        let price = 5;
        let env = envelope_with("p1", price, NOW, NOW - 301);
        let err = v
            .update_price(&submitter_ctx(), price, NOW, &encode_envelope(&env).expect("encode"))
            .expect_err("stale");
        assert!(matches!(
            err,
            VerifierError::InvalidAttestation(AttestationFault::Stale { .. })
        ));

        let env = envelope_with("p1", price, NOW, NOW - 300);
        v.update_price(&submitter_ctx(), price, NOW, &encode_envelope(&env).expect("encode"))
            .expect("freshness boundary is inclusive");
    }

    #[test]
    fn test_attestation_from_future() {
        let mut v = verifier();
        let env = envelope_with("p1", 5, NOW, NOW + MAX_CLOCK_SKEW_SECS + 1);
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &encode_envelope(&env).expect("encode"))
            .expect_err("future attestation");
        assert!(matches!(
            err,
            VerifierError::InvalidAttestation(AttestationFault::FromFuture { .. })
        ));
    }

    #[test]
    fn test_unauthorized_producer() {
        let mut v = verifier();
        let env = envelope_with("p2", 5, NOW, NOW);
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &encode_envelope(&env).expect("encode"))
            .expect_err("unknown producer");
        assert_eq!(
            err,
            VerifierError::UnauthorizedProducer(ProducerId::new("p2").expect("producer"))
        );
    }

    #[test]
    fn test_bad_proof_outranks_unauthorized_producer() {
        let mut v = verifier();
        let mut env = envelope_with("p2", 5, NOW, NOW);
        env.proof = vec![0u8; 7];
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &encode_envelope(&env).expect("encode"))
            .expect_err("bad proof");
        assert!(matches!(
            err,
            VerifierError::InvalidAttestation(AttestationFault::Proof(_))
        ));
        assert!(v.latest_price().is_err());
    }

    #[test]
    fn test_tampered_proof() {
        let mut v = verifier();
        let mut env = envelope_with("p1", 5, NOW, NOW);
        env.proof[0] ^= 0xFF;
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &encode_envelope(&env).expect("encode"))
            .expect_err("tampered");
        assert!(matches!(
            err,
            VerifierError::InvalidAttestation(AttestationFault::Proof(_))
        ));
    }

    #[test]
    fn test_rejections_are_deterministic() {
        let mut v = verifier();
        let bytes = attestation(7, NOW);
        let first = v
            .update_price(&submitter_ctx(), 8, NOW, &bytes)
            .expect_err("mismatch");
        for _ in 0..5 {
            let again = v
                .update_price(&submitter_ctx(), 8, NOW, &bytes)
                .expect_err("mismatch");
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_threshold_events() {
        let mut v = verifier();
        v.set_thresholds(&owner_ctx(), 2_500 * PRICE_SCALE, 1_500 * PRICE_SCALE, true)
            .expect("thresholds");
        v.drain_events();

        let high = 3_000 * PRICE_SCALE;
        let receipt = v
            .update_price(&submitter_ctx(), high, NOW, &attestation(high, NOW))
            .expect("high");
        let breaches: Vec<_> = receipt
            .events
            .iter()
            .filter_map(VerifierEvent::is_upper_breach)
            .collect();
        assert_eq!(breaches, vec![true]);
        assert!(matches!(
            receipt.events[0],
            VerifierEvent::ThresholdBreached {
                side: BreachSide::Upper,
                ..
            }
        ));

        let low = 1_000 * PRICE_SCALE;
        let receipt = v
            .update_price(&submitter_ctx(), low, NOW, &attestation(low, NOW))
            .expect("low");
        let breaches: Vec<_> = receipt
            .events
            .iter()
            .filter_map(VerifierEvent::is_upper_breach)
            .collect();
        assert_eq!(breaches, vec![false]);

        let mid = 2_000 * PRICE_SCALE;
        let receipt = v
            .update_price(&submitter_ctx(), mid, NOW, &attestation(mid, NOW))
            .expect("mid");
        assert_eq!(receipt.events.len(), 1);

        v.set_thresholds(&owner_ctx(), 2_500 * PRICE_SCALE, 1_500 * PRICE_SCALE, false)
            .expect("disable");
        for price in [high, low] {
            let receipt = v
                .update_price(&submitter_ctx(), price, NOW, &attestation(price, NOW))
                .expect("update");
            assert_eq!(receipt.events.len(), 1);
        }
    }

    #[test]
    fn test_registry_changes_apply_immediately() {
        let mut v = verifier();
        let bytes = attestation(5, NOW);
        v.update_price(&submitter_ctx(), 5, NOW, &bytes)
            .expect("authorized");

        v.set_producer_authorization(&owner_ctx(), p1(), false)
            .expect("revoke producer");
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &bytes)
            .expect_err("revoked producer");
        assert_eq!(err.kind(), RejectionKind::UnauthorizedProducer);

        v.set_submitter_authorization(&owner_ctx(), SUBMITTER, false)
            .expect("revoke submitter");
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &bytes)
            .expect_err("revoked submitter");
        assert_eq!(err.kind(), RejectionKind::UnauthorizedSubmitter);
    }

    #[test]
    fn test_registry_mutators_require_owner() {
        let mut v = verifier();
        let ctx = submitter_ctx();
        assert_eq!(
            v.set_thresholds(&ctx, 2, 1, true).expect_err("not owner").kind(),
            RejectionKind::UnauthorizedCaller
        );
        assert_eq!(
            v.set_producer_authorization(&ctx, p1(), false)
                .expect_err("not owner")
                .kind(),
            RejectionKind::UnauthorizedCaller
        );
        assert!(v.registry().is_producer_authorized(&p1()));
        assert!(v.drain_events().is_empty());
    }

    #[test]
    fn test_ed25519_scheme() {
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let mut v = Verifier::new(OWNER, VerifierParams::default())
            .with_proof_scheme(Box::new(Ed25519Proofs::new().with_key(p1(), key.verifying_key())));
        v.set_producer_authorization(&owner_ctx(), p1(), true)
            .expect("producer");
        v.set_submitter_authorization(&owner_ctx(), SUBMITTER, true)
            .expect("submitter");

        let mut env = envelope_with("p1", 5, NOW, NOW);
        // Digest proofs are not signatures.
        let err = v
            .update_price(&submitter_ctx(), 5, NOW, &encode_envelope(&env).expect("encode"))
            .expect_err("digest under ed25519");
        assert_eq!(err.kind(), RejectionKind::InvalidAttestation);

        env.proof = key
            .sign(&signing_bytes(&env.producer_id, env.attested_at, &env.payload))
            .to_bytes()
            .to_vec();
        v.update_price(&submitter_ctx(), 5, NOW, &encode_envelope(&env).expect("encode"))
            .expect("signed envelope");
    }
}
