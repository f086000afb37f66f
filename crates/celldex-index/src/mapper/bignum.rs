//! Order-preserving string encodings for arbitrary precision numbers.
//!
//! Both encoders shift values by a complement so every encoded number is
//! non-negative, then render them at a fixed width. Fixed-width non-negative
//! renderings compare byte-wise in numeric order, which lets string terms
//! back range queries and sorting.

use std::str::FromStr;

use celldex_data::Value;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::IndexError;

/// Radix used for big integer terms.
const RADIX: u32 = 36;

/// Number of decimal digits in the magnitude of `n`.
fn digit_count(n: &BigInt) -> usize {
    n.magnitude().to_string().len()
}

/// `10^exp` as a big integer.
fn ten_pow(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// Encodes integers of up to `digits` decimal digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigIntegerEncoder {
    /// Maximum number of decimal digits.
    digits: u32,
    /// `10^digits - 1`, added to every value.
    complement: BigInt,
    /// Width of encoded terms.
    width: usize,
}

impl BigIntegerEncoder {
    /// Default maximum number of digits.
    pub const DEFAULT_DIGITS: u32 = 32;

    /// Creates an encoder for integers of at most `digits` decimal digits.
    pub fn new(digits: u32) -> Result<Self, IndexError> {
        if digits == 0 {
            return Err(IndexError::Configuration(
                "bigint 'digits' must be positive".into(),
            ));
        }
        let complement = ten_pow(digits) - 1;
        let max: BigInt = &complement * 2;
        let width = max.to_str_radix(RADIX).len() + 1;
        Ok(Self {
            digits,
            complement,
            width,
        })
    }

    /// Maximum number of decimal digits.
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Encodes `value` as a fixed-width radix-36 term.
    pub fn encode(&self, field: &str, value: &Value) -> Result<String, IndexError> {
        let invalid = |reason: String| IndexError::invalid_value(field, "bigint", value, reason);

        let n = match value {
            Value::Int(v) => BigInt::from(*v),
            Value::Varint(v) => v.clone(),
            Value::Text(s) => BigInt::from_str(s.trim())
                .map_err(|_| invalid(format!("'{s}' is not an integer")))?,
            other => return Err(invalid(format!("{} is not an integer", other.kind()))),
        };

        let count = digit_count(&n);
        if count > self.digits as usize {
            return Err(invalid(format!(
                "{count} digits exceed the maximum of {}",
                self.digits
            )));
        }

        let shifted = n + &self.complement;
        let encoded = shifted.to_str_radix(RADIX);
        Ok(format!("{encoded:0>width$}", width = self.width))
    }
}

/// Encodes decimals with bounded integer and fraction digit counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigDecimalEncoder {
    /// Maximum number of integer digits.
    integer_digits: u32,
    /// Maximum number of fraction digits.
    decimal_digits: u32,
    /// `10^integer_digits - 10^-decimal_digits`, scaled by `10^decimal_digits`.
    complement: BigInt,
    /// `10^decimal_digits`.
    unit: BigInt,
}

impl BigDecimalEncoder {
    /// Default maximum number of integer digits.
    pub const DEFAULT_INTEGER_DIGITS: u32 = 32;
    /// Default maximum number of fraction digits.
    pub const DEFAULT_DECIMAL_DIGITS: u32 = 32;

    /// Creates an encoder for decimals within the given digit counts.
    pub fn new(integer_digits: u32, decimal_digits: u32) -> Result<Self, IndexError> {
        if integer_digits == 0 {
            return Err(IndexError::Configuration(
                "bigdec 'integer_digits' must be positive".into(),
            ));
        }
        Ok(Self {
            integer_digits,
            decimal_digits,
            complement: ten_pow(integer_digits + decimal_digits) - 1,
            unit: ten_pow(decimal_digits),
        })
    }

    /// Maximum number of integer digits.
    pub fn integer_digits(&self) -> u32 {
        self.integer_digits
    }

    /// Maximum number of fraction digits.
    pub fn decimal_digits(&self) -> u32 {
        self.decimal_digits
    }

    /// Encodes `value` as `<integer>.<fraction>` at a fixed width.
    pub fn encode(&self, field: &str, value: &Value) -> Result<String, IndexError> {
        let invalid = |reason: String| IndexError::invalid_value(field, "bigdec", value, reason);

        let (unscaled, scale) = match value {
            Value::Int(v) => (BigInt::from(*v), 0),
            Value::Varint(v) => (v.clone(), 0),
            Value::Decimal { unscaled, scale } => (unscaled.clone(), i64::from(*scale)),
            Value::Float(v) if v.is_finite() => parse_decimal(&v.to_string())
                .ok_or_else(|| invalid(format!("'{v}' is not a decimal")))?,
            Value::Text(s) => {
                parse_decimal(s.trim()).ok_or_else(|| invalid(format!("'{s}' is not a decimal")))?
            }
            other => return Err(invalid(format!("{} is not a decimal", other.kind()))),
        };
        let overflow = || invalid("exponent out of range".into());
        let (unscaled, scale) = strip_trailing_zeros(unscaled, scale).ok_or_else(overflow)?;

        let integer_count = i64::try_from(digit_count(&unscaled))
            .ok()
            .and_then(|digits| digits.checked_sub(scale))
            .ok_or_else(overflow)?;
        if integer_count > i64::from(self.integer_digits) {
            return Err(invalid(format!(
                "{integer_count} integer digits exceed the maximum of {}",
                self.integer_digits
            )));
        }
        if scale > i64::from(self.decimal_digits) {
            return Err(invalid(format!(
                "{scale} fraction digits exceed the maximum of {}",
                self.decimal_digits
            )));
        }

        let rescale = u32::try_from(i64::from(self.decimal_digits) - scale)
            .map_err(|_| invalid("scale out of range".into()))?;
        let shifted = unscaled * ten_pow(rescale) + &self.complement;

        let integer = (&shifted / &self.unit).to_string();
        let fraction = (&shifted % &self.unit).to_string();
        let integer_width = self.integer_digits as usize + 1;
        let fraction_width = (self.decimal_digits as usize).max(1);
        Ok(format!(
            "{integer:0>integer_width$}.{fraction:0>fraction_width$}"
        ))
    }
}

/// Removes trailing zeros from the unscaled value, lowering the scale.
/// Returns `None` if the scale underflows.
fn strip_trailing_zeros(mut unscaled: BigInt, mut scale: i64) -> Option<(BigInt, i64)> {
    if unscaled.is_zero() {
        return Some((unscaled, 0));
    }
    let ten = BigInt::from(10u32);
    while (&unscaled % &ten).is_zero() {
        unscaled /= &ten;
        scale = scale.checked_sub(1)?;
    }
    Some((unscaled, scale))
}

/// Parses decimal notation with an optional exponent into unscaled value
/// and scale.
fn parse_decimal(s: &str) -> Option<(BigInt, i64)> {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(pos) => (&s[..pos], s[pos + 1..].parse::<i64>().ok()?),
        None => (s, 0),
    };
    let (sign, digits) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let unscaled = BigInt::from_str(&format!("{sign}{integer}{fraction}")).ok()?;
    let scale = i64::try_from(fraction.len()).ok()?.checked_sub(exponent)?;
    Some((unscaled, scale))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn bigint(digits: u32, v: i64) -> String {
        BigIntegerEncoder::new(digits)
            .unwrap()
            .encode("f", &Value::Int(v))
            .unwrap()
    }

    #[test]
    fn bigint_encodes_at_fixed_width() {
        // 2 * (10^8 - 1) = 199999998 is "3b2ozi" in radix 36.
        assert_eq!(bigint(8, 0).len(), 7);
        assert_eq!(bigint(8, -99_999_999), "0000000");
        assert_eq!(bigint(8, 99_999_999), "03b2ozi");
    }

    #[test]
    fn bigint_orders_like_numbers() {
        let values = [-99_999_999, -100, -1, 0, 1, 100, 99_999_999];
        let encoded: Vec<_> = values.iter().map(|v| bigint(8, *v)).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
    }

    #[test]
    fn bigint_rejects_too_many_digits() {
        let encoder = BigIntegerEncoder::new(8).unwrap();
        let err = encoder.encode("f", &Value::Int(100_000_000)).unwrap_err();
        assert!(matches!(err, IndexError::InvalidValue { .. }));
        assert!(encoder.encode("f", &Value::Int(-100_000_000)).is_err());
    }

    #[test]
    fn bigint_accepts_strings_and_varints() {
        let encoder = BigIntegerEncoder::new(8).unwrap();
        assert_eq!(
            encoder.encode("f", &Value::from(" 42 ")).unwrap(),
            encoder.encode("f", &Value::Varint(BigInt::from(42))).unwrap()
        );
        assert!(encoder.encode("f", &Value::from("4.2")).is_err());
        assert!(encoder.encode("f", &Value::Float(4.0)).is_err());
    }

    #[test]
    fn bigint_requires_positive_digits() {
        assert!(matches!(
            BigIntegerEncoder::new(0),
            Err(IndexError::Configuration(_))
        ));
    }

    fn bigdec(value: &str) -> Result<String, IndexError> {
        BigDecimalEncoder::new(4, 4)
            .unwrap()
            .encode("f", &Value::from(value))
    }

    #[test]
    fn bigdec_validates_after_stripping_zeros() {
        assert!(bigdec("42.0000").is_ok());
        assert!(bigdec("42.00000000").is_ok());
        assert!(bigdec("42.00001").is_err());
        assert!(bigdec("9999.9999").is_ok());
        assert!(bigdec("10000").is_err());
    }

    #[test]
    fn bigdec_renders_fixed_width() {
        // complement = 9999.9999
        assert_eq!(bigdec("0").unwrap(), "09999.9999");
        assert_eq!(bigdec("-9999.9999").unwrap(), "00000.0000");
        assert_eq!(bigdec("9999.9999").unwrap(), "19999.9998");
        assert_eq!(bigdec("1.5").unwrap(), "10001.4999");
    }

    #[test]
    fn bigdec_orders_like_numbers() {
        let values = ["-9999.9999", "-12.5", "-0.0001", "0", "0.0001", "0.5", "12", "9999.9999"];
        let encoded: Vec<_> = values.iter().map(|v| bigdec(v).unwrap()).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
    }

    #[test]
    fn bigdec_accepts_exponents_and_numbers() {
        let encoder = BigDecimalEncoder::new(4, 4).unwrap();
        assert_eq!(bigdec("1.2e2").unwrap(), bigdec("120").unwrap());
        assert_eq!(
            encoder.encode("f", &Value::Float(0.25)).unwrap(),
            bigdec("0.25").unwrap()
        );
        assert_eq!(
            encoder.encode("f", &Value::Int(7)).unwrap(),
            bigdec("7").unwrap()
        );
        assert!(bigdec("abc").is_err());
        assert!(bigdec(".").is_err());
    }

    #[test]
    fn bigdec_rejects_extreme_exponents() {
        for value in [
            "1e9223372036854775807",
            "100e9223372036854775807",
            "1e-9223372036854775808",
            "1e-9223372036854775807",
        ] {
            assert!(
                matches!(bigdec(value), Err(IndexError::InvalidValue { .. })),
                "{value}"
            );
        }
        let encoder = BigDecimalEncoder::new(4, 4).unwrap();
        for scale in [i32::MIN, i32::MAX] {
            let value = Value::Decimal {
                unscaled: BigInt::from(7),
                scale,
            };
            assert!(encoder.encode("f", &value).is_err());
        }
    }

    #[test]
    fn parse_decimal_shapes() {
        assert_eq!(parse_decimal("1.50"), Some((BigInt::from(150), 2)));
        assert_eq!(parse_decimal("-.5"), Some((BigInt::from(-5), 1)));
        assert_eq!(parse_decimal("3E-2"), Some((BigInt::from(3), 2)));
        assert_eq!(parse_decimal("1x"), None);
        assert_eq!(parse_decimal("1e-9223372036854775808"), None);
    }

    proptest! {
        #[test]
        fn bigint_monotonic(a in -99_999_999_i64..=99_999_999, b in -99_999_999_i64..=99_999_999) {
            let (ea, eb) = (bigint(8, a), bigint(8, b));
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn bigdec_monotonic(a in -99_999_999_i64..=99_999_999, b in -99_999_999_i64..=99_999_999) {
            let encoder = BigDecimalEncoder::new(4, 4).unwrap();
            let as_decimal = |v: i64| Value::Decimal { unscaled: BigInt::from(v), scale: 4 };
            let ea = encoder.encode("f", &as_decimal(a)).unwrap();
            let eb = encoder.encode("f", &as_decimal(b)).unwrap();
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }
    }
}
