//! Coercion of dynamic values to fixed-width numbers.
//!
//! Strings are parsed at the target width first and otherwise as a base-10
//! float that is narrowed with `as`, so `"3.7"` becomes `3` for integers.
//! Decimals follow the same rule through integer arithmetic.

use std::str::FromStr;

use celldex_data::Value;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// A numeric target type with `as`-style narrowing.
pub trait Narrow: FromStr + Copy {
    /// Narrows a 64-bit integer.
    fn from_i64(v: i64) -> Self;
    /// Narrows a 64-bit float.
    fn from_f64(v: f64) -> Self;
    /// Converts a 64-bit integer the target width holds, like parsing it.
    fn exact_i64(v: i64) -> Option<Self> {
        Some(Self::from_i64(v))
    }
}

impl Narrow for i32 {
    fn from_i64(v: i64) -> Self {
        v as Self
    }

    fn exact_i64(v: i64) -> Option<Self> {
        Self::try_from(v).ok()
    }

    fn from_f64(v: f64) -> Self {
        v as Self
    }
}

impl Narrow for i64 {
    fn from_i64(v: i64) -> Self {
        v
    }

    fn from_f64(v: f64) -> Self {
        v as Self
    }
}

impl Narrow for f32 {
    fn from_i64(v: i64) -> Self {
        v as Self
    }

    fn from_f64(v: f64) -> Self {
        v as Self
    }
}

impl Narrow for f64 {
    fn from_i64(v: i64) -> Self {
        v as Self
    }

    fn from_f64(v: f64) -> Self {
        v
    }
}

/// Coerces `value` to `T`, returning the failure reason on error.
pub fn coerce<T: Narrow>(value: &Value) -> Result<T, String> {
    match value {
        Value::Int(v) | Value::Timestamp(v) => Ok(T::from_i64(*v)),
        Value::Float(v) => Ok(T::from_f64(*v)),
        Value::Varint(v) => Ok(match v.to_i64() {
            Some(small) => T::from_i64(small),
            None => T::from_f64(v.to_f64().unwrap_or(f64::NAN)),
        }),
        Value::Decimal { unscaled, scale } => decimal(unscaled, *scale),
        Value::Text(s) => parse(s),
        other => Err(format!("{} is not a number", other.kind())),
    }
}

/// Coerces a decimal. Integral values the target holds convert exactly,
/// others go through `f64`; values beyond its range are rejected.
fn decimal<T: Narrow>(unscaled: &BigInt, scale: i32) -> Result<T, String> {
    if let Some(v) = integral(unscaled, scale).and_then(T::exact_i64) {
        return Ok(v);
    }
    let magnitude = 10f64.powi(scale.unsigned_abs().min(MAX_F64_EXPONENT) as i32);
    let v = unscaled.to_f64().unwrap_or(f64::NAN);
    let v = if scale > 0 { v / magnitude } else { v * magnitude };
    if v.is_finite() {
        Ok(T::from_f64(v))
    } else {
        Err(format!("decimal with scale {scale} is out of range"))
    }
}

/// Powers of ten beyond this overflow or underflow every `f64`.
const MAX_F64_EXPONENT: u32 = 400;

/// Largest power of ten an `i64` holds.
const MAX_I64_EXPONENT: u32 = 18;

/// The value of a decimal if it is an integer fitting `i64`.
fn integral(unscaled: &BigInt, scale: i32) -> Option<i64> {
    if unscaled.is_zero() {
        return Some(0);
    }
    let exponent = scale.unsigned_abs();
    if scale <= 0 {
        if exponent > MAX_I64_EXPONENT {
            return None;
        }
        return (unscaled * BigInt::from(10u64.pow(exponent))).to_i64();
    }
    // A scale beyond the digit count leaves a non-zero fraction.
    if u64::from(exponent) > unscaled.bits() {
        return None;
    }
    let unit = BigInt::from(10u32).pow(exponent);
    if (unscaled % &unit).is_zero() {
        (unscaled / &unit).to_i64()
    } else {
        None
    }
}

/// Parses a numeric string at the target width, falling back to `f64`.
fn parse<T: Narrow>(s: &str) -> Result<T, String> {
    let s = s.trim();
    if let Ok(v) = s.parse::<T>() {
        return Ok(v);
    }
    s.parse::<f64>()
        .map(T::from_f64)
        .map_err(|_| format!("'{s}' is not a number"))
}
