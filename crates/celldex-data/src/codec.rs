//! Native binary encodings of storage values.
//!
//! Numbers are big-endian and fixed width, varints are two's complement,
//! decimals are an `i32` scale followed by a varint, text is UTF-8. An empty
//! buffer decodes to [`Value::Null`] for every non-textual type.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use num_bigint::BigInt;
use uuid::Uuid;

use crate::{DataError, TypeTag, Value};

/// Decodes a scalar value of type `type_tag` from its native bytes.
pub fn decode(bytes: &[u8], type_tag: &TypeTag) -> Result<Value, DataError> {
    if bytes.is_empty() && !type_tag.is_textual() && *type_tag != TypeTag::Blob {
        return Ok(Value::Null);
    }

    match type_tag {
        TypeTag::Ascii => {
            if !bytes.is_ascii() {
                return Err(DataError::decode(type_tag, "non-ASCII byte"));
            }
            decode_utf8(bytes, type_tag)
        }
        TypeTag::Text | TypeTag::Varchar => decode_utf8(bytes, type_tag),
        TypeTag::Int => Ok(Value::Int(i64::from(i32::from_be_bytes(fixed(
            bytes, type_tag,
        )?)))),
        TypeTag::BigInt | TypeTag::Counter => {
            Ok(Value::Int(i64::from_be_bytes(fixed(bytes, type_tag)?)))
        }
        TypeTag::Timestamp => Ok(Value::Timestamp(i64::from_be_bytes(fixed(
            bytes, type_tag,
        )?))),
        TypeTag::Varint => Ok(Value::Varint(BigInt::from_signed_bytes_be(bytes))),
        TypeTag::Decimal => {
            if bytes.len() < 5 {
                return Err(DataError::decode(type_tag, "expected at least 5 bytes"));
            }
            let (scale, unscaled) = bytes.split_at(4);
            let scale = i32::from_be_bytes(fixed(scale, type_tag)?);
            Ok(Value::Decimal {
                unscaled: BigInt::from_signed_bytes_be(unscaled),
                scale,
            })
        }
        TypeTag::Float => Ok(Value::Float(f64::from(f32::from_be_bytes(fixed(
            bytes, type_tag,
        )?)))),
        TypeTag::Double => Ok(Value::Float(f64::from_be_bytes(fixed(bytes, type_tag)?))),
        TypeTag::Boolean => {
            let [byte] = fixed(bytes, type_tag)?;
            Ok(Value::Bool(byte != 0))
        }
        TypeTag::Uuid => Ok(Value::Uuid(Uuid::from_bytes(fixed(bytes, type_tag)?))),
        TypeTag::TimeUuid => {
            let uuid = Uuid::from_bytes(fixed(bytes, type_tag)?);
            if uuid.get_version_num() != 1 {
                return Err(DataError::decode(type_tag, "not a version 1 UUID"));
            }
            Ok(Value::Uuid(uuid))
        }
        TypeTag::Inet => match bytes.len() {
            4 => Ok(Value::Inet(IpAddr::V4(Ipv4Addr::from(fixed::<4>(
                bytes, type_tag,
            )?)))),
            16 => Ok(Value::Inet(IpAddr::V6(Ipv6Addr::from(fixed::<16>(
                bytes, type_tag,
            )?)))),
            n => Err(DataError::decode(
                type_tag,
                format!("expected 4 or 16 bytes, got {n}"),
            )),
        },
        TypeTag::Blob => Ok(Value::Bytes(bytes.to_vec())),
        TypeTag::Set(_) | TypeTag::List(_) | TypeTag::Map(..) => Err(DataError::decode(
            type_tag,
            "collections are decoded one cell at a time",
        )),
    }
}

/// Serializes a scalar value as `type_tag`'s native bytes.
///
/// This is the inverse of [`decode`]; [`Value::Null`] serializes to an empty
/// buffer.
pub fn serialize(value: &Value, type_tag: &TypeTag) -> Result<Vec<u8>, DataError> {
    let mismatch = || {
        DataError::serialize(
            type_tag,
            format!("{} value '{value}' does not fit", value.kind()),
        )
    };

    match (type_tag, value) {
        (_, Value::Null) => Ok(Vec::new()),
        (TypeTag::Ascii, Value::Text(s)) if !s.is_ascii() => Err(mismatch()),
        (TypeTag::Ascii | TypeTag::Text | TypeTag::Varchar, Value::Text(s)) => {
            Ok(s.as_bytes().to_vec())
        }
        (TypeTag::Int, Value::Int(i)) => Ok(i32::try_from(*i)
            .map_err(|_| mismatch())?
            .to_be_bytes()
            .to_vec()),
        (TypeTag::BigInt | TypeTag::Counter, Value::Int(i))
        | (TypeTag::Timestamp, Value::Timestamp(i) | Value::Int(i)) => {
            Ok(i.to_be_bytes().to_vec())
        }
        (TypeTag::Varint, Value::Varint(i)) => Ok(i.to_signed_bytes_be()),
        (TypeTag::Varint, Value::Int(i)) => Ok(BigInt::from(*i).to_signed_bytes_be()),
        (TypeTag::Decimal, Value::Decimal { unscaled, scale }) => {
            let mut bytes = scale.to_be_bytes().to_vec();
            bytes.extend(unscaled.to_signed_bytes_be());
            Ok(bytes)
        }
        #[allow(clippy::cast_possible_truncation)]
        (TypeTag::Float, Value::Float(x)) => Ok((*x as f32).to_be_bytes().to_vec()),
        (TypeTag::Double, Value::Float(x)) => Ok(x.to_be_bytes().to_vec()),
        (TypeTag::Boolean, Value::Bool(b)) => Ok(vec![u8::from(*b)]),
        (TypeTag::Uuid | TypeTag::TimeUuid, Value::Uuid(uuid)) => Ok(uuid.as_bytes().to_vec()),
        (TypeTag::Inet, Value::Inet(IpAddr::V4(addr))) => Ok(addr.octets().to_vec()),
        (TypeTag::Inet, Value::Inet(IpAddr::V6(addr))) => Ok(addr.octets().to_vec()),
        (TypeTag::Blob, Value::Bytes(bytes)) => Ok(bytes.clone()),
        _ => Err(mismatch()),
    }
}

/// Reads a textual literal as a scalar value of type `type_tag`.
///
/// Integers and floats use Rust's number syntax, decimals keep the scale
/// written, blobs are hex with an optional `0x` prefix and booleans are
/// `true` or `false` in any case.
pub fn parse_literal(text: &str, type_tag: &TypeTag) -> Result<Value, DataError> {
    let invalid = |reason: String| DataError::Literal {
        type_tag: type_tag.clone(),
        text: text.to_string(),
        reason,
    };

    match type_tag {
        TypeTag::Ascii | TypeTag::Text | TypeTag::Varchar => Ok(Value::Text(text.to_string())),
        TypeTag::Int | TypeTag::BigInt | TypeTag::Counter => text
            .parse()
            .map(Value::Int)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Timestamp => text
            .parse()
            .map(Value::Timestamp)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Varint => text
            .parse()
            .map(Value::Varint)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Decimal => parse_decimal(text).ok_or_else(|| invalid("not a decimal number".into())),
        TypeTag::Float | TypeTag::Double => text
            .parse()
            .map(Value::Float)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("expected true or false".into())),
        },
        TypeTag::Uuid | TypeTag::TimeUuid => Uuid::parse_str(text)
            .map(Value::Uuid)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Inet => text
            .parse()
            .map(Value::Inet)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Blob => hex::decode(text.strip_prefix("0x").unwrap_or(text))
            .map(Value::Bytes)
            .map_err(|e| invalid(e.to_string())),
        TypeTag::Set(_) | TypeTag::List(_) | TypeTag::Map(..) => {
            Err(invalid("collections have no scalar literal".into()))
        }
    }
}

/// Parses `[-]digits[.digits]` keeping the number of fraction digits as scale.
fn parse_decimal(text: &str) -> Option<Value> {
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
    let digits = int_part.trim_start_matches(['-', '+']);
    if (digits.is_empty() && frac_part.is_empty())
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let scale = i32::try_from(frac_part.len()).ok()?;
    let unscaled: BigInt = format!("{int_part}{frac_part}").parse().ok()?;
    Some(Value::Decimal { unscaled, scale })
}

/// Decodes UTF-8 text.
fn decode_utf8(bytes: &[u8], type_tag: &TypeTag) -> Result<Value, DataError> {
    String::from_utf8(bytes.to_vec())
        .map(Value::Text)
        .map_err(|e| DataError::decode(type_tag, e.to_string()))
}

/// Copies exactly `N` bytes into an array.
fn fixed<const N: usize>(bytes: &[u8], type_tag: &TypeTag) -> Result<[u8; N], DataError> {
    bytes.try_into().map_err(|_| {
        DataError::decode(
            type_tag,
            format!("expected {N} bytes, got {}", bytes.len()),
        )
    })
}
