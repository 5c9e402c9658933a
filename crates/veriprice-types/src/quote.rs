//! Fixed-point price quotes and the attestation envelope that carries them.

use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::{Price, ProducerId, TypesError, UnixSeconds, MAX_SOURCE_LEN};

/// A single normalized price observation.
///
/// `value` is scaled by [`PRICE_SCALE`](crate::PRICE_SCALE) and is always
/// greater than zero.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    #[serde_as(as = "DisplayFromStr")]
    value: Price,
    observed_at: UnixSeconds,
    source: String,
}

impl PriceQuote {
    /// Build a quote, rejecting a zero value or an oversize source label.
    pub fn new(value: Price, observed_at: UnixSeconds, source: impl Into<String>) -> crate::Result<Self> {
        if value == 0 {
            return Err(TypesError::ZeroPrice);
        }
        let source = source.into();
        if source.len() > MAX_SOURCE_LEN {
            return Err(TypesError::SourceTooLong(source.len()));
        }
        Ok(Self {
            value,
            observed_at,
            source,
        })
    }

    /// Scaled price value.
    pub fn value(&self) -> Price {
        self.value
    }

    /// Unix timestamp of the observation.
    pub fn observed_at(&self) -> UnixSeconds {
        self.observed_at
    }

    /// Label of the quote source (e.g. `"coinbase"`).
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A quote bound to the identity that produced it.
///
/// `payload` holds the canonical encoding of a [`PriceQuote`]; `proof` is an
/// opaque binding over producer, attestation time and payload. Envelopes are
/// built per accepted quote and consumed by submission; they are never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationEnvelope {
    pub producer_id: ProducerId,
    pub attested_at: UnixSeconds,
    pub payload: Vec<u8>,
    pub proof: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PRICE_SCALE;

    #[test]
    fn test_zero_price_rejected() {
        let err = PriceQuote::new(0, 1000, "test").expect_err("zero price");
        assert_eq!(err, TypesError::ZeroPrice);
    }

    #[test]
    fn test_source_too_long() {
        let err = PriceQuote::new(1, 1000, "s".repeat(MAX_SOURCE_LEN + 1)).expect_err("long source");
        assert!(matches!(err, TypesError::SourceTooLong(_)));
    }

    #[test]
    fn test_quote_accessors() {
        let quote = PriceQuote::new(2_000 * PRICE_SCALE, 1_700_000_000, "coinbase").expect("quote");
        assert_eq!(quote.value(), 200_000_000_000);
        assert_eq!(quote.observed_at(), 1_700_000_000);
        assert_eq!(quote.source(), "coinbase");
    }

    #[test]
    fn test_quote_json_value_is_string() {
        let quote = PriceQuote::new(2_000 * PRICE_SCALE, 1, "x").expect("quote");
        let json = serde_json::to_value(&quote).expect("serialize");
        assert_eq!(json["value"], "200000000000");
    }
}
