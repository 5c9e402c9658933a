//! One poll cycle end to end.
//!
//! ```text
//! QuoteSource::fetch ─▶ normalize ─▶ UpdateDecider ─▶ AttestationProducer ─▶ SubmissionClient
//!                                         ▲                                         │
//!                                         └──────────── commit on confirm ──────────┘
//! ```
//!
//! A cycle never returns an error. Failures are logged and reported as
//! [`CycleOutcome::Failed`]; the next cycle starts from the same committed
//! quote.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use veriprice_types::format_price;

use crate::decision::UpdateDecider;
use crate::normalize::normalize_quote;
use crate::producer::AttestationProducer;
use crate::source::QuoteSource;
use crate::submit::{Receipt, SubmissionClient, SubmitError};
use crate::FeederError;

/// Why a cycle did not publish.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    /// Fetching, normalizing or attesting failed.
    #[error(transparent)]
    Feed(#[from] FeederError),

    /// Submission failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The candidate did not move enough to publish.
    Skipped { reason: String },
    /// The candidate was published and committed.
    Published { receipt: Receipt },
    /// The cycle failed; nothing was committed.
    Failed { error: CycleError },
}

/// The feeder pipeline.
pub struct Pipeline {
    symbol: String,
    source: Arc<dyn QuoteSource>,
    decider: UpdateDecider,
    producer: AttestationProducer,
    client: SubmissionClient,
    cycles: u64,
}

impl Pipeline {
    pub fn new(
        symbol: impl Into<String>,
        source: Arc<dyn QuoteSource>,
        decider: UpdateDecider,
        producer: AttestationProducer,
        client: SubmissionClient,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            source,
            decider,
            producer,
            client,
            cycles: 0,
        }
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn decider(&self) -> &UpdateDecider {
        &self.decider
    }

    /// Run fetch, normalize, decide, attest and submit once.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;
        let cycle = self.cycles;

        let raw = match self.source.fetch(&self.symbol).await {
            Ok(raw) => raw,
            Err(e) => return self.fail(cycle, e.into()),
        };
        let quote = match normalize_quote(&raw.value, raw.observed_at, self.source.label()) {
            Ok(quote) => quote,
            Err(e) => return self.fail(cycle, e.into()),
        };

        if !self.decider.should_publish(&quote) {
            let reason = format!(
                "change below {}% of last committed price",
                self.decider.threshold_pct()
            );
            debug!(cycle, price = %format_price(quote.value()), %reason, "update skipped");
            return CycleOutcome::Skipped { reason };
        }

        let envelope = match self.producer.attest(&quote) {
            Ok(envelope) => envelope,
            Err(e) => return self.fail(cycle, e.into()),
        };

        match self
            .client
            .submit(quote.value(), quote.observed_at(), &envelope)
            .await
        {
            Ok(receipt) => {
                info!(
                    cycle,
                    symbol = %self.symbol,
                    price = %format_price(quote.value()),
                    observed_at = quote.observed_at(),
                    attempts = receipt.attempts,
                    "price published"
                );
                self.decider.commit(quote);
                CycleOutcome::Published { receipt }
            }
            Err(e) => self.fail(cycle, e.into()),
        }
    }

    fn fail(&self, cycle: u64, error: CycleError) -> CycleOutcome {
        match &error {
            CycleError::Submit(e) if e.is_transient() => {
                warn!(cycle, symbol = %self.symbol, error = %e, "cycle failed, retrying next interval")
            }
            _ => error!(cycle, symbol = %self.symbol, error = %error, "cycle failed"),
        }
        CycleOutcome::Failed { error }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("symbol", &self.symbol)
            .field("decider", &self.decider)
            .field("producer", &self.producer)
            .field("client", &self.client)
            .field("cycles", &self.cycles)
            .finish()
    }
}
