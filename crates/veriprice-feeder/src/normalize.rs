//! Decimal quotes to fixed-point prices.
//!
//! Quote APIs send prices either as JSON numbers or as decimal strings. Both
//! are parsed into a [`Decimal`] (never a binary float), scaled by 10^8 and
//! rounded to the nearest unit with midpoints away from zero. The same input
//! always yields the same [`Price`].

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use veriprice_types::{Price, PriceQuote, UnixSeconds, PRICE_SCALE};

use crate::{FeederError, Result};

/// Parse a decimal literal, plain or in scientific notation.
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| FeederError::InvalidQuote(format!("not a decimal number: {text:?}")))
}

/// Read the numeric value out of a raw quote field.
pub fn raw_decimal(raw: &Value) -> Result<Decimal> {
    match raw {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        Value::Null => Err(FeederError::InvalidQuote("missing value".into())),
        other => Err(FeederError::InvalidQuote(format!("not numeric: {other}"))),
    }
}

/// Scale a positive decimal to a [`Price`].
pub fn to_fixed_point(value: Decimal) -> Result<Price> {
    if value <= Decimal::ZERO {
        return Err(FeederError::InvalidQuote(format!("price must be positive, got {value}")));
    }
    let scaled = value
        .checked_mul(scale())
        .ok_or_else(|| FeederError::InvalidQuote(format!("{value} overflows the price range")))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let price = scaled
        .to_u128()
        .ok_or_else(|| FeederError::InvalidQuote(format!("{value} overflows the price range")))?;
    if price == 0 {
        return Err(FeederError::InvalidQuote(format!("{value} rounds to zero")));
    }
    Ok(price)
}

/// Parse a decimal string straight to a [`Price`].
pub fn parse_price(text: &str) -> Result<Price> {
    to_fixed_point(parse_decimal(text)?)
}

/// Normalize a raw quote value into a [`PriceQuote`].
pub fn normalize_quote(raw: &Value, observed_at: UnixSeconds, source: &str) -> Result<PriceQuote> {
    let price = to_fixed_point(raw_decimal(raw)?)?;
    Ok(PriceQuote::new(price, observed_at, source)?)
}

fn scale() -> Decimal {
    Decimal::from_i128_with_scale(PRICE_SCALE as i128, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_and_fractional() {
        assert_eq!(parse_price("2000").expect("whole"), 200_000_000_000);
        assert_eq!(parse_price("2099.99999999").expect("fraction"), 209_999_999_999);
        assert_eq!(parse_price(" 0.00000001 ").expect("one unit"), 1);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(parse_price("1.000000005").expect("midpoint"), 100_000_001);
        assert_eq!(parse_price("1.0000000049999").expect("below midpoint"), 100_000_000);
        assert_eq!(parse_price("1.000000015").expect("odd midpoint"), 100_000_002);
    }

    #[test]
    fn test_json_number_and_string_agree() {
        let from_number = normalize_quote(&json!(2000.5), 10, "x").expect("number");
        let from_string = normalize_quote(&json!("2000.5"), 10, "x").expect("string");
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.value(), 200_050_000_000);
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(parse_price("2.5e3").expect("sci"), 250_000_000_000);
    }

    #[test]
    fn test_rejects_bad_input() {
        for raw in [
            json!(null),
            json!("abc"),
            json!(""),
            json!(true),
            json!([1]),
            json!(0),
            json!("-1"),
            json!("0.000000004"),
        ] {
            let err = normalize_quote(&raw, 10, "x").expect_err("invalid");
            assert!(matches!(err, FeederError::InvalidQuote(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(matches!(
            parse_price("79228162514264337593543950335"),
            Err(FeederError::InvalidQuote(_))
        ));
    }

    #[test]
    fn test_normalization_is_reproducible() {
        let first = parse_price("1834.123456789").expect("first");
        for _ in 0..10 {
            assert_eq!(parse_price("1834.123456789").expect("again"), first);
        }
    }
}
