//! Debounce policy.
//!
//! A candidate is published when its relative change against the last
//! committed quote reaches the threshold percentage:
//!
//! ```text
//! |candidate - previous| / previous * 100 >= threshold_pct
//! ```
//!
//! The comparison is done by cross-multiplication in integers, so the
//! boundary is exact: at 5% from 2000.00000000, 2099.99999999 is skipped and
//! 2100.00000000 is published.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use veriprice_types::{Price, PriceQuote};

use crate::{FeederError, Result};

/// Whether `candidate` differs enough from `previous` to publish.
///
/// No previous quote always publishes. A threshold of zero or below always
/// publishes.
pub fn should_update(previous: Option<&PriceQuote>, candidate: &PriceQuote, threshold_pct: Decimal) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if threshold_pct <= Decimal::ZERO {
        return true;
    }
    change_reaches(previous.value(), candidate.value(), threshold_pct)
}

fn change_reaches(previous: Price, candidate: Price, threshold_pct: Decimal) -> bool {
    let diff = previous.abs_diff(candidate);
    let pct = threshold_pct.normalize();
    // pct = mantissa / 10^scale, so the test is diff * 100 * 10^scale >= mantissa * previous.
    let mantissa = pct.mantissa().unsigned_abs();
    let lhs = 10u128
        .checked_pow(pct.scale())
        .and_then(|p| diff.checked_mul(100)?.checked_mul(p));
    let rhs = mantissa.checked_mul(previous);
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => lhs >= rhs,
        (None, Some(_)) => true,
        (_, None) => relative_change_pct(previous, diff).is_some_and(|change| change >= pct),
    }
}

fn relative_change_pct(previous: Price, diff: Price) -> Option<Decimal> {
    let previous = Decimal::from_u128(previous)?;
    let diff = Decimal::from_u128(diff)?;
    diff.checked_div(previous)?.checked_mul(Decimal::ONE_HUNDRED)
}

/// Debounce state: the threshold plus the last *committed* quote.
///
/// The previous value only advances through [`UpdateDecider::commit`], which
/// the pipeline calls after a confirmed submission.
#[derive(Debug, Clone)]
pub struct UpdateDecider {
    threshold_pct: Decimal,
    committed: Option<PriceQuote>,
}

impl UpdateDecider {
    /// Decider with a decimal threshold percentage.
    ///
    /// # Errors
    ///
    /// [`FeederError::InvalidConfig`] if `threshold_pct` is negative.
    pub fn new(threshold_pct: Decimal) -> Result<Self> {
        if threshold_pct.is_sign_negative() && !threshold_pct.is_zero() {
            return Err(FeederError::InvalidConfig(format!(
                "debounce threshold must not be negative, got {threshold_pct}"
            )));
        }
        Ok(Self {
            threshold_pct,
            committed: None,
        })
    }

    /// Decider from a float percentage as read from configuration.
    ///
    /// # Errors
    ///
    /// [`FeederError::InvalidConfig`] if `threshold_pct` is negative or not finite.
    pub fn from_pct(threshold_pct: f64) -> Result<Self> {
        if !threshold_pct.is_finite() {
            return Err(FeederError::InvalidConfig(format!(
                "debounce threshold must be finite, got {threshold_pct}"
            )));
        }
        let pct = Decimal::from_f64(threshold_pct).ok_or_else(|| {
            FeederError::InvalidConfig(format!("debounce threshold out of range: {threshold_pct}"))
        })?;
        Self::new(pct)
    }

    pub fn threshold_pct(&self) -> Decimal {
        self.threshold_pct
    }

    pub fn last_committed(&self) -> Option<&PriceQuote> {
        self.committed.as_ref()
    }

    pub fn should_publish(&self, candidate: &PriceQuote) -> bool {
        should_update(self.committed.as_ref(), candidate, self.threshold_pct)
    }

    /// Record `quote` as the latest confirmed publication.
    pub fn commit(&mut self, quote: PriceQuote) {
        self.committed = Some(quote);
    }
}
