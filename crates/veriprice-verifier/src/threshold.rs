//! Alert bound evaluation.
//!
//! Alert bounds are independent of the feeder's debounce percentage: they
//! do not decide whether a price is committed, only whether a committed
//! price raises a [`VerifierEvent::ThresholdBreached`].

use veriprice_types::events::{BreachSide, VerifierEvent};
use veriprice_types::{Price, ThresholdConfig};

/// Breach event for `price` under `config`, if any.
///
/// Bounds are exclusive: a price equal to a bound is in range.
pub fn evaluate(config: &ThresholdConfig, price: Price) -> Option<VerifierEvent> {
    if !config.enabled {
        return None;
    }
    let (side, bound_value) = if price > config.upper_bound {
        (BreachSide::Upper, config.upper_bound)
    } else if price < config.lower_bound {
        (BreachSide::Lower, config.lower_bound)
    } else {
        return None;
    };
    tracing::warn!(price, ?side, bound_value, "threshold breached");
    Some(VerifierEvent::ThresholdBreached {
        price,
        side,
        bound_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriprice_types::PRICE_SCALE;

    fn band() -> ThresholdConfig {
        ThresholdConfig {
            upper_bound: 2_500 * PRICE_SCALE,
            lower_bound: 1_500 * PRICE_SCALE,
            enabled: true,
        }
    }

    #[test]
    fn test_upper_breach() {
        let event = evaluate(&band(), 3_000 * PRICE_SCALE).expect("breach");
        assert_eq!(
            event,
            VerifierEvent::ThresholdBreached {
                price: 3_000 * PRICE_SCALE,
                side: BreachSide::Upper,
                bound_value: 2_500 * PRICE_SCALE,
            }
        );
    }

    #[test]
    fn test_lower_breach() {
        let event = evaluate(&band(), 1_000 * PRICE_SCALE).expect("breach");
        assert_eq!(event.is_upper_breach(), Some(false));
    }

    #[test]
    fn test_in_range_and_on_bounds() {
        assert!(evaluate(&band(), 2_000 * PRICE_SCALE).is_none());
        assert!(evaluate(&band(), 2_500 * PRICE_SCALE).is_none());
        assert!(evaluate(&band(), 1_500 * PRICE_SCALE).is_none());
    }

    #[test]
    fn test_disabled_never_breaches() {
        let config = ThresholdConfig {
            enabled: false,
            ..band()
        };
        for price in [1, 1_000 * PRICE_SCALE, 3_000 * PRICE_SCALE, Price::MAX] {
            assert!(evaluate(&config, price).is_none());
        }
    }
}
