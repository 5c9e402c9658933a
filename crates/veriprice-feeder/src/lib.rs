//! # veriprice-feeder
//!
//! The off-chain half of Veriprice: turns raw external quotes into attested
//! submissions.
//!
//! Each poll cycle runs fetch, normalize, decide, attest and submit to
//! completion before the next one starts.
//!
//! ## Modules
//!
//! - [`normalize`]: Decimal quotes to fixed-point prices
//! - [`decision`]: Debounce policy
//! - [`producer`]: Attestation envelopes and proof signers
//! - [`submit`]: Ledger transport and retrying submission client
//! - [`pipeline`]: One poll cycle end to end
//! - [`source`]: Quote sources
//! - [`clock`]: Injectable time

pub mod clock;
pub mod decision;
pub mod normalize;
pub mod pipeline;
pub mod producer;
pub mod source;
pub mod submit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{should_update, UpdateDecider};
pub use pipeline::{CycleError, CycleOutcome, Pipeline};
pub use producer::{AttestationProducer, DigestSigner, Ed25519Signer, ProofSigner};
pub use source::{QuoteSource, RawQuote, StubQuoteSource};
pub use submit::{LedgerTransport, Receipt, RetryPolicy, SubmissionClient, SubmitError};

use veriprice_types::TypesError;
use veriprice_wire::WireError;

/// Errors raised before a submission is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeederError {
    /// The raw quote is missing, non-numeric, non-positive or out of range.
    #[error("invalid quote: {0}")]
    InvalidQuote(String),

    /// A feeder setting is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The quote source failed to produce a value.
    #[error("quote source error: {0}")]
    Source(String),

    #[error("quote rejected: {0}")]
    Quote(#[from] TypesError),

    #[error("encoding failed: {0}")]
    Wire(#[from] WireError),
}

/// Convenience result type for feeder operations.
pub type Result<T> = std::result::Result<T, FeederError>;
