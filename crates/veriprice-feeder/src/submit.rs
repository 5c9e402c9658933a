//! Ledger transport and retrying submission client.
//!
//! [`LedgerTransport`] is the async seam to whatever hosts the verifier. A
//! transport performs one attempt per call and never retries; retry, fee
//! margin and balance checks belong to [`SubmissionClient`].
//!
//! ## Failure handling
//!
//! | Transport error | Client behavior |
//! |-----------------|-----------------|
//! | `Network` | back off and retry, up to the attempt cap |
//! | `Underpriced` | re-estimate with the reported floor and retry |
//! | `InsufficientBalance` | fail `Underfunded` immediately |
//! | `Rejected` | fail `RejectedByVerifier` immediately |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};
use veriprice_types::events::VerifierEvent;
use veriprice_types::{Address, AttestationEnvelope, Hash, Price, UnixSeconds};
use veriprice_verifier::VerifierError;
use veriprice_wire::{encode_envelope, WireError};

use crate::{FeederError, Result};

/// Default number of attempts per submission.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Default ceiling for the retry delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);
/// Default safety margin on estimated fees, in percent.
pub const DEFAULT_FEE_MARGIN_PCT: u32 = 20;

/// One `update_price` call as sent to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub submitter: Address,
    pub price: Price,
    pub observed_at: UnixSeconds,
    pub attestation: Vec<u8>,
    /// Fee offered for this attempt.
    pub fee: u128,
}

/// What the ledger reports for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub tx_id: Hash,
    pub fee_paid: u128,
    pub events: Vec<VerifierEvent>,
}

/// Errors from a single transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Transient connectivity failure.
    #[error("network error: {0}")]
    Network(String),

    /// The offered fee is below what the ledger currently requires.
    #[error("fee {offered} below required {required}")]
    Underpriced { offered: u128, required: u128 },

    /// The submitter cannot pay the fee.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    /// The verifier rejected the call.
    #[error("rejected: {0}")]
    Rejected(#[from] VerifierError),
}

/// Async access to the ledger hosting the verifier.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Current cost of one `update_price` call.
    async fn estimate_fee(&self) -> std::result::Result<u128, LedgerError>;

    /// Spendable balance of `account`.
    async fn balance(&self, account: &Address) -> std::result::Result<u128, LedgerError>;

    /// Send one submission.
    async fn send(&self, submission: &Submission) -> std::result::Result<LedgerReceipt, LedgerError>;
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// # Errors
    ///
    /// [`FeederError::InvalidConfig`] if `max_attempts` is zero.
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(FeederError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        Ok(Self {
            max_attempts,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `failed`-th failed attempt (1-based).
    pub fn backoff(&self, failed: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// A confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: Hash,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    pub fee_paid: u128,
    pub events: Vec<VerifierEvent>,
}

/// Submission failures surfaced to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Transient failures exhausted every attempt.
    #[error("network error after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    /// The submitter cannot cover the margined fee.
    #[error("underfunded: need {needed}, have {available}")]
    Underfunded { needed: u128, available: u128 },

    /// Every attempt was underpriced.
    #[error("fee underpriced on all {attempts} attempts")]
    Underpriced { attempts: u32 },

    /// The verifier rejected the update. Not retried.
    #[error("rejected by verifier: {0}")]
    RejectedByVerifier(VerifierError),

    #[error("envelope encoding failed: {0}")]
    Encoding(#[from] WireError),
}

impl SubmitError {
    /// Whether the next poll cycle may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Underpriced { .. })
    }
}

/// Delivers attested updates with bounded retry.
pub struct SubmissionClient {
    transport: Arc<dyn LedgerTransport>,
    submitter: Address,
    policy: RetryPolicy,
    fee_margin_pct: u32,
}

impl SubmissionClient {
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        submitter: Address,
        policy: RetryPolicy,
        fee_margin_pct: u32,
    ) -> Self {
        Self {
            transport,
            submitter,
            policy,
            fee_margin_pct,
        }
    }

    pub fn submitter(&self) -> Address {
        self.submitter
    }

    /// `estimate` plus the safety margin, rounded up.
    pub fn margined_fee(&self, estimate: u128) -> u128 {
        estimate
            .saturating_mul(100 + u128::from(self.fee_margin_pct))
            .div_ceil(100)
    }

    /// Submit `envelope` as the attestation for `price` at `observed_at`.
    pub async fn submit(
        &self,
        price: Price,
        observed_at: UnixSeconds,
        envelope: &AttestationEnvelope,
    ) -> std::result::Result<Receipt, SubmitError> {
        let attestation = encode_envelope(envelope)?;
        let max_attempts = self.policy.max_attempts();
        let mut fee_floor = 0u128;
        let mut underpriced = 0u32;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.backoff(attempt - 1)).await;
            }
            match self.attempt(price, observed_at, &attestation, fee_floor).await {
                Ok(receipt) => {
                    info!(
                        tx_id = %short_tx_id(&receipt.tx_id),
                        attempt,
                        fee = receipt.fee_paid,
                        "submission confirmed"
                    );
                    return Ok(Receipt {
                        tx_id: receipt.tx_id,
                        attempts: attempt,
                        fee_paid: receipt.fee_paid,
                        events: receipt.events,
                    });
                }
                Err(LedgerError::Network(message)) => {
                    warn!(attempt, max_attempts, error = %message, "transient submission failure");
                    last_error = message;
                }
                Err(LedgerError::Underpriced { offered, required }) => {
                    warn!(attempt, offered, required, "submission underpriced, re-estimating");
                    underpriced += 1;
                    fee_floor = fee_floor.max(required);
                    last_error = format!("fee {offered} below required {required}");
                }
                Err(LedgerError::InsufficientBalance { needed, available }) => {
                    error!(needed, available, submitter = %self.submitter, "submitter underfunded");
                    return Err(SubmitError::Underfunded { needed, available });
                }
                Err(LedgerError::Rejected(reason)) => {
                    warn!(reason = %reason, "submission rejected by verifier");
                    return Err(SubmitError::RejectedByVerifier(reason));
                }
            }
        }

        if underpriced == max_attempts {
            error!(attempts = max_attempts, "fee underpriced on every attempt");
            return Err(SubmitError::Underpriced {
                attempts: max_attempts,
            });
        }
        error!(attempts = max_attempts, error = %last_error, "submission retries exhausted");
        Err(SubmitError::Network {
            attempts: max_attempts,
            message: last_error,
        })
    }

    async fn attempt(
        &self,
        price: Price,
        observed_at: UnixSeconds,
        attestation: &[u8],
        fee_floor: u128,
    ) -> std::result::Result<LedgerReceipt, LedgerError> {
        let estimate = self.transport.estimate_fee().await?.max(fee_floor);
        let fee = self.margined_fee(estimate);
        let available = self.transport.balance(&self.submitter).await?;
        if available < fee {
            return Err(LedgerError::InsufficientBalance {
                needed: fee,
                available,
            });
        }
        self.transport
            .send(&Submission {
                submitter: self.submitter,
                price,
                observed_at,
                attestation: attestation.to_vec(),
                fee,
            })
            .await
    }
}

impl std::fmt::Debug for SubmissionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionClient")
            .field("submitter", &self.submitter)
            .field("policy", &self.policy)
            .field("fee_margin_pct", &self.fee_margin_pct)
            .finish()
    }
}

/// First four bytes of a transaction id, for log lines.
fn short_tx_id(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}
