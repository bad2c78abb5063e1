//! Human amount <-> base unit conversion

use crate::tx_builder::errors::TransactionBuilderError;

/// Convert a human amount into integer base units at `decimals`
///
/// Rounds to the nearest base unit. Rejects non-finite or non-positive
/// amounts, amounts below one base unit and amounts that overflow `u64`.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64, TransactionBuilderError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(TransactionBuilderError::InvalidAmount(format!(
            "{} is not a positive number",
            amount
        )));
    }

    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    if scaled < 1.0 {
        return Err(TransactionBuilderError::InvalidAmount(format!(
            "{} is smaller than the smallest unit (10^-{})",
            amount, decimals
        )));
    }
    // u64::MAX is not exactly representable; anything at or past 2^64 overflows
    if scaled >= 18_446_744_073_709_551_616.0 {
        return Err(TransactionBuilderError::InvalidAmount(format!(
            "{} is too large",
            amount
        )));
    }

    Ok(scaled as u64)
}

/// Base units back to a human amount (display only)
pub fn from_base_units(units: u64, decimals: u8) -> f64 {
    units as f64 / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_native_conversion() {
        assert_eq!(to_base_units(0.1, 9).unwrap(), 100_000_000);
        assert_eq!(to_base_units(1.0, 9).unwrap(), 1_000_000_000);
        assert_eq!(to_base_units(0.000000001, 9).unwrap(), 1);
    }

    #[test]
    fn test_token_conversion() {
        assert_eq!(to_base_units(2.5, 6).unwrap(), 2_500_000);
        assert_eq!(to_base_units(0.01, 6).unwrap(), 10_000);
        // Classic binary float trap
        assert_eq!(to_base_units(0.29, 6).unwrap(), 290_000);
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        assert!(to_base_units(0.0, 9).is_err());
        assert!(to_base_units(-1.0, 9).is_err());
        assert!(to_base_units(f64::NAN, 6).is_err());
        assert!(to_base_units(f64::INFINITY, 6).is_err());
        assert!(to_base_units(0.0000001, 6).is_err());
        assert!(to_base_units(1e20, 9).is_err());
    }

    #[test]
    fn test_from_base_units() {
        assert_eq!(from_base_units(1_500_000, 6), 1.5);
        assert_eq!(from_base_units(0, 9), 0.0);
    }

    proptest! {
        #[test]
        fn prop_whole_token_amounts_are_exact(units in 1u64..1_000_000_000u64) {
            let human = from_base_units(units, 6);
            prop_assert_eq!(to_base_units(human, 6).unwrap(), units);
        }

        #[test]
        fn prop_positive_amounts_never_zero(amount in 0.000001f64..1_000_000.0f64) {
            prop_assert!(to_base_units(amount, 6).unwrap() >= 1);
        }
    }
}
