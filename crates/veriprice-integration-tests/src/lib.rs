//! End-to-end tests for Veriprice.
//!
//! The tests under `tests/` drive the feeder pipeline against a
//! [`LocalLedger`] hosting the verifier, with a manual clock so freshness
//! windows are deterministic. This crate only holds shared fixtures.
//!
//! ```sh
//! cargo test -p veriprice-integration-tests
//! ```

use std::sync::Arc;

use veriprice_daemon::{EventBus, LocalLedger};
use veriprice_feeder::{
    AttestationProducer, DigestSigner, ManualClock, Pipeline, RetryPolicy, StubQuoteSource,
    SubmissionClient, UpdateDecider,
};
use veriprice_types::{Address, ProducerId, UnixSeconds};
use veriprice_verifier::{Verifier, VerifierParams};

/// Fixed start time for every scenario.
pub const T0: UnixSeconds = 1_700_000_000;
pub const OWNER: Address = Address([0x0A; 20]);
/// Authorized submitter.
pub const SUBMITTER_A: Address = Address([0xA1; 20]);
/// Never authorized.
pub const SUBMITTER_B: Address = Address([0xB2; 20]);
pub const PRODUCER: &str = "p1";
pub const CALL_COST: u128 = 1_000;

/// A ledger, its clock and the stub source feeding a pipeline.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<LocalLedger>,
    pub source: Arc<StubQuoteSource>,
    pub pipeline: Pipeline,
}

pub fn producer_id() -> ProducerId {
    ProducerId::new(PRODUCER).expect("valid producer id")
}

/// A ledger with producer `p1` and submitter A authorized and A funded.
pub async fn ledger(clock: Arc<ManualClock>, bus: EventBus) -> Arc<LocalLedger> {
    let ledger = Arc::new(LocalLedger::new(
        Verifier::new(OWNER, VerifierParams::default()),
        clock,
        bus,
        CALL_COST,
    ));
    ledger
        .execute(OWNER, |v, ctx| {
            v.set_producer_authorization(ctx, producer_id(), true)?;
            v.set_submitter_authorization(ctx, SUBMITTER_A, true)
        })
        .await
        .expect("bootstrap registry");
    ledger.fund(SUBMITTER_A, 1_000 * CALL_COST).await;
    ledger
}

/// Full pipeline submitting as A with the digest-binding scheme.
pub async fn harness(stub_price: &str, debounce_pct: f64) -> Harness {
    let clock = Arc::new(ManualClock::new(T0));
    let ledger = ledger(clock.clone(), EventBus::new(256)).await;
    let source = Arc::new(StubQuoteSource::with_price("stub", stub_price, clock.clone()));
    let producer = AttestationProducer::new(producer_id(), Box::new(DigestSigner), clock.clone());
    let client = SubmissionClient::new(ledger.clone(), SUBMITTER_A, RetryPolicy::default(), 20);
    let decider = UpdateDecider::from_pct(debounce_pct).expect("valid debounce");
    let pipeline = Pipeline::new("ETHUSD", source.clone(), decider, producer, client);
    Harness {
        clock,
        ledger,
        source,
        pipeline,
    }
}
