//! # veriprice-types
//!
//! Shared domain types used across the Veriprice workspace.
//!
//! ## Modules
//!
//! - [`identity`]: Submitter addresses and producer identifiers
//! - [`quote`]: Fixed-point price quotes and attestation envelopes
//! - [`record`]: Verifier-owned singletons (latest record, thresholds)
//! - [`events`]: Events emitted by the verifier and registry

pub mod events;
pub mod identity;
pub mod quote;
pub mod record;

pub use identity::{Address, ProducerId};
pub use quote::{AttestationEnvelope, PriceQuote};
pub use record::{LatestRecord, ThresholdConfig};

/// Fixed-point price scaled by [`PRICE_SCALE`].
pub type Price = u128;
/// Unix timestamp in seconds.
pub type UnixSeconds = u64;
/// 32-byte digest.
pub type Hash = [u8; 32];

/// Number of decimal places carried by a [`Price`].
pub const PRICE_DECIMALS: u32 = 8;

/// Fixed-point scale (1.0 = 100,000,000 units).
pub const PRICE_SCALE: Price = 100_000_000;

/// Maximum tolerated age of an observation when committed (1 hour).
pub const MAX_AGE_SECS: u64 = 3600;

/// Maximum tolerated age of an attestation when committed (5 minutes).
pub const ATTESTATION_FRESHNESS_SECS: u64 = 300;

/// Tolerated clock drift for timestamps that lie in the future.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

/// Maximum length of a producer identifier in bytes.
pub const MAX_PRODUCER_ID_LEN: usize = 64;

/// Maximum length of a quote source label in bytes.
pub const MAX_SOURCE_LEN: usize = 64;

/// Error types for domain type construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// Quote value is zero.
    #[error("price must be greater than zero")]
    ZeroPrice,

    /// Source label is longer than [`MAX_SOURCE_LEN`].
    #[error("source label too long: {0} bytes")]
    SourceTooLong(usize),

    /// Producer identifier is empty or longer than [`MAX_PRODUCER_ID_LEN`].
    #[error("invalid producer id: {0}")]
    InvalidProducerId(String),

    /// Address is not 20 hex-encoded bytes.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Convenience result type for domain type construction.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Render a fixed-point price as a decimal string (e.g. `2000.00000000`).
pub fn format_price(price: Price) -> String {
    format!(
        "{}.{:0width$}",
        price / PRICE_SCALE,
        price % PRICE_SCALE,
        width = PRICE_DECIMALS as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(2_000 * PRICE_SCALE), "2000.00000000");
        assert_eq!(format_price(209_999_999_999), "2099.99999999");
        assert_eq!(format_price(1), "0.00000001");
    }

    #[test]
    fn test_freshness_windows() {
        assert!(ATTESTATION_FRESHNESS_SECS < MAX_AGE_SECS);
        assert!(MAX_CLOCK_SKEW_SECS < ATTESTATION_FRESHNESS_SECS);
    }
}
