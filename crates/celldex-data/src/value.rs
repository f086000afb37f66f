//! Dynamically typed values.
//!
//! [`Value`] is what a storage cell decodes to and what a query condition
//! carries. Encoders coerce it into a field's base type.

use std::{fmt, net::IpAddr};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use uuid::Uuid;

/// A dynamically typed scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer that fits in 64 bits.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Arbitrary-precision integer.
    Varint(BigInt),
    /// Arbitrary-precision decimal: `unscaled * 10^-scale`.
    Decimal {
        /// Unscaled digits.
        unscaled: BigInt,
        /// Number of digits after the decimal point.
        scale: i32,
    },
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UUID of any version.
    Uuid(Uuid),
    /// Network address.
    Inet(IpAddr),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
}

impl Value {
    /// Returns true if this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Varint(_) => "varint",
            Self::Decimal { .. } => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Inet(_) => "inet",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Returns the text if this is a [`Value::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Largest scale magnitude rendered in plain notation.
pub const MAX_PLAIN_SCALE: u32 = 100;

/// Renders an unscaled integer and scale as plain decimal notation.
///
/// Scales beyond [`MAX_PLAIN_SCALE`] in magnitude render as the unscaled
/// digits with an exponent, so the output stays proportional to the input.
pub fn plain_decimal(unscaled: &BigInt, scale: i32) -> String {
    let digits = unscaled.abs().to_string();
    let sign = if unscaled.is_negative() { "-" } else { "" };

    if scale.unsigned_abs() > MAX_PLAIN_SCALE && !unscaled.is_zero() {
        return format!("{sign}{digits}E{}", -i64::from(scale));
    }
    if scale <= 0 {
        let zeros = if unscaled.is_zero() {
            String::new()
        } else {
            "0".repeat(scale.unsigned_abs() as usize)
        };
        return format!("{sign}{digits}{zeros}");
    }

    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale - digits.len() + 1))
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Varint(i) => write!(f, "{i}"),
            Self::Decimal { unscaled, scale } => f.write_str(&plain_decimal(unscaled, *scale)),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
            Self::Uuid(uuid) => write!(f, "{}", uuid.hyphenated()),
            Self::Inet(addr) => write!(f, "{addr}"),
            Self::Timestamp(millis) => write!(f, "{millis}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Self::Varint(i)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
