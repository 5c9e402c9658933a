//! Quote sources.
//!
//! A [`QuoteSource`] is a read-only view of an external price API. It hands
//! back the raw value exactly as the API sent it; normalization happens in
//! the pipeline.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use veriprice_types::UnixSeconds;

use crate::clock::Clock;
use crate::{FeederError, Result};

/// Default stub price: 2000 quote units.
pub const DEFAULT_STUB_PRICE: &str = "2000.00000000";

/// A raw quote as returned by a source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    /// Number or decimal string.
    pub value: Value,
    pub observed_at: UnixSeconds,
}

/// External price feed.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Label recorded in the quote payload.
    fn label(&self) -> &str;

    async fn fetch(&self, symbol: &str) -> Result<RawQuote>;
}

/// A source that returns a configured price.
///
/// Used for local runs and tests where no external API is reachable. The
/// price can be changed at runtime with [`set_price`](StubQuoteSource::set_price).
pub struct StubQuoteSource {
    label: String,
    price: RwLock<String>,
    clock: Arc<dyn Clock>,
}

impl StubQuoteSource {
    pub fn new(label: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self::with_price(label, DEFAULT_STUB_PRICE, clock)
    }

    pub fn with_price(label: impl Into<String>, price: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            label: label.into(),
            price: RwLock::new(price.into()),
            clock,
        }
    }

    /// Replace the quoted price (development and testing only).
    pub fn set_price(&self, price: impl Into<String>) -> Result<()> {
        let price = price.into();
        tracing::warn!(new_price = %price, "stub quote source: price changed (dev only)");
        let mut slot = self
            .price
            .write()
            .map_err(|_| FeederError::Source("stub price lock poisoned".into()))?;
        *slot = price;
        Ok(())
    }
}

impl std::fmt::Debug for StubQuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubQuoteSource")
            .field("label", &self.label)
            .field("price", &self.price)
            .finish()
    }
}

#[async_trait]
impl QuoteSource for StubQuoteSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, _symbol: &str) -> Result<RawQuote> {
        let price = self
            .price
            .read()
            .map_err(|_| FeederError::Source("stub price lock poisoned".into()))?
            .clone();
        Ok(RawQuote {
            value: Value::String(price),
            observed_at: self.clock.now(),
        })
    }
}
