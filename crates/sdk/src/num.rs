//! Decimal to on-chain fixed-point conversion.

use alloy::primitives::U256;
use fastnum::UD64;

use crate::error::DexError;

/// Converts decimal amounts and prices into integers scaled by `10^decimals`.
///
/// Rounding is explicit: [`Converter::to_unsigned`] truncates digits beyond
/// the precision, [`Converter::to_unsigned_ceil`] rounds them up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Converter {
    decimals: u8,
}

#[derive(Clone, Copy)]
enum Rounding {
    Floor,
    Ceil,
}

impl Converter {
    pub const fn new(decimals: u8) -> Self { Self { decimals } }

    pub fn decimals(&self) -> u8 { self.decimals }

    pub fn to_unsigned(&self, value: UD64) -> Result<U256, DexError> {
        self.scale(value, Rounding::Floor)
    }

    pub fn to_unsigned_ceil(&self, value: UD64) -> Result<U256, DexError> {
        self.scale(value, Rounding::Ceil)
    }

    fn scale(&self, value: UD64, rounding: Rounding) -> Result<U256, DexError> {
        let overflow = || DexError::InvalidArgument(format!("{value} overflows"));
        let coefficient = U256::from_str_radix(&value.digits().to_string(), 10)
            .map_err(|_| DexError::InvalidArgument(format!("unsupported decimal {value}")))?;
        let pow10 = |exp: i32| U256::from(10).checked_pow(U256::from(exp.unsigned_abs()));

        // value = coefficient * 10^-fractional_digits
        let shift = i32::from(self.decimals) - i32::from(value.fractional_digits_count());
        if shift >= 0 {
            return pow10(shift)
                .and_then(|factor| coefficient.checked_mul(factor))
                .ok_or_else(overflow);
        }
        let (kept, dropped) = match pow10(shift) {
            Some(divisor) => (coefficient / divisor, coefficient % divisor),
            None => (U256::ZERO, coefficient),
        };
        match rounding {
            Rounding::Ceil if !dropped.is_zero() => Ok(kept + U256::from(1)),
            _ => Ok(kept),
        }
    }
}

#[cfg(test)]
mod tests {
    use fastnum::udec64;

    use super::*;

    #[test]
    fn test_to_unsigned() {
        assert_eq!(Converter::new(8).to_unsigned(udec64!(2.50)).unwrap(), U256::from(250_000_000));
        assert_eq!(
            Converter::new(18).to_unsigned(udec64!(1.0)).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(Converter::new(0).to_unsigned(udec64!(42)).unwrap(), U256::from(42));
        assert_eq!(
            Converter::new(6).to_unsigned(udec64!(1.5) * udec64!(2.5)).unwrap(),
            U256::from(3_750_000)
        );
    }

    #[test]
    fn test_rounding() {
        let usdc = Converter::new(6);
        assert_eq!(usdc.to_unsigned(udec64!(0.0000019)).unwrap(), U256::from(1));
        assert_eq!(usdc.to_unsigned_ceil(udec64!(0.0000019)).unwrap(), U256::from(2));
        assert_eq!(usdc.to_unsigned(udec64!(0.0000001)).unwrap(), U256::ZERO);
        assert_eq!(usdc.to_unsigned_ceil(udec64!(0.0000001)).unwrap(), U256::from(1));
        assert_eq!(usdc.to_unsigned_ceil(udec64!(3.000000)).unwrap(), U256::from(3_000_000));
        assert_eq!(Converter::new(0).to_unsigned_ceil(udec64!(0.5)).unwrap(), U256::from(1));
    }

    #[test]
    fn test_overflow() {
        let converter = Converter::new(77);
        assert!(matches!(converter.to_unsigned(udec64!(100)), Err(DexError::InvalidArgument(_))));
        assert_eq!(Converter::new(0).to_unsigned(UD64::ZERO).unwrap(), U256::ZERO);
    }
}
