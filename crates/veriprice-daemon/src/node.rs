//! Node assembly and the poll loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;
use veriprice_crypto::ed25519::SigningKey;
use veriprice_feeder::{
    AttestationProducer, Clock, DigestSigner, Ed25519Signer, Pipeline, ProofSigner,
    StubQuoteSource, SubmissionClient,
};
use veriprice_verifier::{DigestBinding, Ed25519Proofs, ProofScheme, Verifier};

use crate::config::{DaemonConfig, ProofSchemeKind};
use crate::events::EventBus;
use crate::ledger::LocalLedger;

/// Everything a running daemon needs.
pub struct Node {
    pub ledger: Arc<LocalLedger>,
    pub source: Arc<StubQuoteSource>,
    pub pipeline: Pipeline,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("ledger", &self.ledger)
            .field("pipeline", &self.pipeline)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Build the verifier, ledger and pipeline described by `config`.
///
/// The owner authorizes the configured producer and submitter and applies
/// the alert bounds before the first cycle runs.
pub async fn build(config: &DaemonConfig, clock: Arc<dyn Clock>, bus: EventBus) -> anyhow::Result<Node> {
    config.validate()?;
    let producer_id = config.feed.producer_id()?;

    let (signer, scheme): (Box<dyn ProofSigner>, Box<dyn ProofScheme>) = match config.feed.proof_scheme()? {
        ProofSchemeKind::Digest => (Box::new(DigestSigner), Box::new(DigestBinding)),
        ProofSchemeKind::Ed25519 => {
            let key = config.feed.signing_key()?.unwrap_or_else(SigningKey::generate);
            let signer = Ed25519Signer::new(key);
            let scheme = Ed25519Proofs::new().with_key(producer_id.clone(), signer.verifying_key());
            (Box::new(signer), Box::new(scheme))
        }
    };
    info!(scheme = signer.scheme(), producer = %producer_id, "proof scheme selected");

    let verifier = Verifier::new(config.verifier.owner, config.verifier.params()).with_proof_scheme(scheme);
    let ledger = Arc::new(LocalLedger::new(
        verifier,
        clock.clone(),
        bus,
        u128::from(config.submission.call_cost),
    ));

    let submitter = config.submission.submitter;
    let bounds = config.verifier.alert_bounds()?;
    let alerts_enabled = config.verifier.alerts_enabled;
    let bootstrap_id = producer_id.clone();
    ledger
        .execute(config.verifier.owner, move |v, ctx| {
            v.set_producer_authorization(ctx, bootstrap_id, true)?;
            v.set_submitter_authorization(ctx, submitter, true)?;
            if let Some((upper, lower)) = bounds {
                v.set_thresholds(ctx, upper, lower, alerts_enabled)?;
            }
            Ok(())
        })
        .await?;
    ledger
        .fund(submitter, u128::from(config.submission.initial_balance))
        .await;

    let source = Arc::new(StubQuoteSource::with_price(
        config.feed.source_label.clone(),
        config.feed.stub_price.clone(),
        clock.clone(),
    ));
    let producer = AttestationProducer::new(producer_id, signer, clock);
    let client = SubmissionClient::new(
        ledger.clone(),
        submitter,
        config.submission.retry_policy()?,
        config.submission.fee_margin_pct,
    );
    let pipeline = Pipeline::new(
        config.feed.symbol.clone(),
        source.clone(),
        config.feed.decider()?,
        producer,
        client,
    );

    Ok(Node {
        ledger,
        source,
        pipeline,
        poll_interval: config.feed.poll_interval(),
    })
}

/// Run poll cycles every `interval` until `shutdown` resolves.
///
/// Shutdown is only observed between cycles; a cycle in flight always runs
/// to completion. Returns the number of cycles run.
pub async fn run_poll_loop(
    pipeline: &mut Pipeline,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let start = pipeline.cycles();

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                // Outcomes are logged by the pipeline itself.
                pipeline.run_cycle().await;
            }
        }
    }

    let ran = pipeline.cycles() - start;
    info!(cycles = ran, "poll loop stopped");
    ran
}
