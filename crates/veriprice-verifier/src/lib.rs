//! # veriprice-verifier
//!
//! The authoritative state machine for attested price updates.
//!
//! A [`Verifier`] owns the latest committed record, the alert thresholds and
//! the two authorization sets. Its single mutating entry point,
//! [`Verifier::update_price`], either commits a new record and emits events
//! or rejects the call with no observable state change.
//!
//! The verifier performs no locking. Its host must serialize calls, e.g. by
//! holding it behind a single mutex.
//!
//! ## Modules
//!
//! - [`verifier`]: Update validation and commit
//! - [`registry`]: Owner-gated authorization and threshold configuration
//! - [`threshold`]: Alert bound evaluation
//! - [`proof`]: Pluggable attestation proof schemes
//! - [`hash`]: Committed record data hash

pub mod hash;
pub mod proof;
pub mod registry;
pub mod threshold;
pub mod verifier;

pub use proof::{DigestBinding, Ed25519Proofs, ProofScheme};
pub use registry::Registry;
pub use verifier::{CallContext, UpdateReceipt, Verifier, VerifierParams, VerifierState};

use serde::Serialize;
use veriprice_types::{Address, Price, ProducerId, UnixSeconds};
use veriprice_wire::WireError;

/// Why an attestation was found invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestationFault {
    /// The envelope or its payload could not be decoded.
    #[error("malformed: {0}")]
    Malformed(#[from] WireError),

    /// The payload does not carry the price and timestamp of the call.
    #[error(
        "payload mismatch: attested {attested_price}@{attested_observed_at}, called {price}@{observed_at}"
    )]
    PayloadMismatch {
        attested_price: Price,
        attested_observed_at: UnixSeconds,
        price: Price,
        observed_at: UnixSeconds,
    },

    /// The attestation is older than the freshness window.
    #[error("stale: attested at {attested_at}, now {now}, window {window}s")]
    Stale {
        attested_at: UnixSeconds,
        now: UnixSeconds,
        window: u64,
    },

    /// The attestation claims a time beyond the tolerated clock skew.
    #[error("attested in the future: {attested_at} > {now}")]
    FromFuture {
        attested_at: UnixSeconds,
        now: UnixSeconds,
    },

    /// The proof failed the configured proof scheme.
    #[error("proof rejected: {0}")]
    Proof(String),
}

/// Rejection reasons for verifier and registry calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    /// The caller is not an authorized submitter.
    #[error("unauthorized submitter: {0}")]
    UnauthorizedSubmitter(Address),

    /// The price or observation time is unusable.
    #[error("invalid price data: {0}")]
    InvalidPriceData(&'static str),

    /// The observation is older than the maximum age.
    #[error("price too old: observed at {observed_at}, now {now}, max age {max_age}s")]
    PriceTooOld {
        observed_at: UnixSeconds,
        now: UnixSeconds,
        max_age: u64,
    },

    /// The attestation is malformed, mismatched, stale or unproven.
    #[error("invalid attestation: {0}")]
    InvalidAttestation(#[from] AttestationFault),

    /// The attesting producer is not authorized.
    #[error("unauthorized producer: {0}")]
    UnauthorizedProducer(ProducerId),

    /// Enabled thresholds require `upper > lower`.
    #[error("invalid threshold range: upper {upper} <= lower {lower}")]
    InvalidThresholdRange { upper: Price, lower: Price },

    /// A registry mutation was attempted by someone other than the owner.
    #[error("unauthorized caller: {0}")]
    UnauthorizedCaller(Address),

    /// No update has been committed yet.
    #[error("no price data")]
    NoPriceData,
}

/// Stable, payload-free code for each rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    UnauthorizedSubmitter,
    InvalidPriceData,
    PriceTooOld,
    InvalidAttestation,
    UnauthorizedProducer,
    InvalidThresholdRange,
    UnauthorizedCaller,
    NoPriceData,
}

impl VerifierError {
    /// The rejection code for this error.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::UnauthorizedSubmitter(_) => RejectionKind::UnauthorizedSubmitter,
            Self::InvalidPriceData(_) => RejectionKind::InvalidPriceData,
            Self::PriceTooOld { .. } => RejectionKind::PriceTooOld,
            Self::InvalidAttestation(_) => RejectionKind::InvalidAttestation,
            Self::UnauthorizedProducer(_) => RejectionKind::UnauthorizedProducer,
            Self::InvalidThresholdRange { .. } => RejectionKind::InvalidThresholdRange,
            Self::UnauthorizedCaller(_) => RejectionKind::UnauthorizedCaller,
            Self::NoPriceData => RejectionKind::NoPriceData,
        }
    }
}

/// Convenience result type for verifier operations.
pub type Result<T> = std::result::Result<T, VerifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_converts_to_invalid_attestation() {
        let err: VerifierError = AttestationFault::from(WireError::TrailingBytes(3)).into();
        assert_eq!(err.kind(), RejectionKind::InvalidAttestation);
        assert_eq!(
            err.to_string(),
            "invalid attestation: malformed: 3 trailing bytes after envelope"
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_value(RejectionKind::PriceTooOld).expect("serialize");
        assert_eq!(json, "price_too_old");
    }

    #[test]
    fn test_kind_ignores_payload() {
        let a = VerifierError::UnauthorizedCaller(Address([1; 20]));
        let b = VerifierError::UnauthorizedCaller(Address([2; 20]));
        assert_ne!(a, b);
        assert_eq!(a.kind(), b.kind());
    }
}
