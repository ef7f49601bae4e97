//! Rupee amounts: parsing, validation and conversion to paise.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Largest single payment accepted, in rupees.
pub const MAX_AMOUNT_RUPEES: i64 = 1_000_000;

/// Reads a JSON number as an exact decimal. Strings, booleans and nulls are rejected.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    let Value::Number(number) = value else {
        return None;
    };
    let raw = number.to_string();
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

pub fn validate_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO
        && amount <= Decimal::from(MAX_AMOUNT_RUPEES)
        && rupees_to_paise(amount).is_some_and(|paise| paise >= 1)
}

/// Converts rupees to paise, rounding half away from zero.
pub fn rupees_to_paise(amount: Decimal) -> Option<u64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
}

pub fn format_paise(paise: u64) -> String {
    format!("₹{}.{:02}", paise / 100, paise % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_rupees_to_paise() {
        assert_eq!(rupees_to_paise(dec!(100.50)), Some(10050));
        assert_eq!(rupees_to_paise(dec!(0.01)), Some(1));
        assert_eq!(rupees_to_paise(dec!(0.015)), Some(2));
        assert_eq!(rupees_to_paise(dec!(19.999)), Some(2000));
    }

    #[test]
    fn test_parse_amount_from_json_float() {
        // 100.50 arrives as an f64; no paise may be lost
        let amount = parse_amount(&json!(100.50)).unwrap();
        assert_eq!(rupees_to_paise(amount), Some(10050));

        let amount = parse_amount(&json!(0.29)).unwrap();
        assert_eq!(rupees_to_paise(amount), Some(29));

        let amount = parse_amount(&json!(1.005)).unwrap();
        assert_eq!(rupees_to_paise(amount), Some(101));
    }

    #[test]
    fn test_parse_amount_rejects_non_numbers() {
        assert_eq!(parse_amount(&json!("100")), None);
        assert_eq!(parse_amount(&json!(null)), None);
        assert_eq!(parse_amount(&json!(true)), None);
        assert_eq!(parse_amount(&json!({"value": 1})), None);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(1)));
        assert!(validate_amount(dec!(0.01)));
        assert!(validate_amount(Decimal::from(MAX_AMOUNT_RUPEES)));
        assert!(!validate_amount(dec!(0)));
        assert!(!validate_amount(dec!(-5)));
        assert!(!validate_amount(dec!(0.004)));
        assert!(!validate_amount(dec!(1000000.01)));
    }

    #[test]
    fn test_format_paise() {
        assert_eq!(format_paise(10050), "₹100.50");
        assert_eq!(format_paise(7), "₹0.07");
    }

    proptest! {
        #[test]
        fn paise_conversion_is_exact(paise in 1u64..=100_000_000u64) {
            let amount = Decimal::new(paise as i64, 2);
            prop_assert_eq!(rupees_to_paise(amount), Some(paise));
        }

        #[test]
        fn paise_conversion_survives_json_floats(paise in 1u64..=10_000_000u64) {
            let as_float = paise as f64 / 100.0;
            let amount = parse_amount(&serde_json::json!(as_float)).unwrap();
            prop_assert_eq!(rupees_to_paise(amount), Some(paise));
        }
    }
}
