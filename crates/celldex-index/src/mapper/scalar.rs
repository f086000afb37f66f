//! Coercions for the string-based scalar mappers.

use std::{net::IpAddr, sync::LazyLock};

use celldex_data::Value;
use regex::Regex;
use uuid::Uuid;

/// Dotted-quad IPv4 literal.
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)$")
        .expect("IPv4 pattern should compile")
});

/// Full or compressed IPv6 literal, optionally ending in an IPv4 quad.
static IPV6: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9A-Fa-f]{0,4}:){2,7}(?:[0-9A-Fa-f]{0,4}|(?:\d{1,3}\.){3}\d{1,3})$")
        .expect("IPv6 pattern should compile")
});

/// Renders any scalar as text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerces to a boolean term.
pub fn boolean(value: &Value) -> Result<&'static str, String> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    };
    match parsed {
        Some(true) => Ok("true"),
        Some(false) => Ok("false"),
        None => Err("expected true or false".into()),
    }
}

/// Coerces to a canonical lower-case hyphenated UUID.
pub fn uuid(value: &Value) -> Result<String, String> {
    match value {
        Value::Uuid(uuid) => Ok(uuid.hyphenated().to_string()),
        Value::Text(s) => Uuid::parse_str(s.trim())
            .map(|uuid| uuid.hyphenated().to_string())
            .map_err(|e| e.to_string()),
        other => Err(format!("{} is not a uuid", other.kind())),
    }
}

/// Coerces to a normalized IP address literal.
pub fn inet(value: &Value) -> Result<String, String> {
    match value {
        Value::Inet(addr) => Ok(addr.to_string()),
        Value::Text(s) => {
            let s = s.trim();
            if !IPV4.is_match(s) && !IPV6.is_match(s) {
                return Err("not an IPv4 or IPv6 address".into());
            }
            s.parse::<IpAddr>()
                .map(|addr| addr.to_string())
                .map_err(|e| e.to_string())
        }
        other => Err(format!("{} is not an address", other.kind())),
    }
}

/// Coerces bytes or a hex string to lower-case hex.
pub fn blob(value: &Value) -> Result<String, String> {
    match value {
        Value::Bytes(bytes) => Ok(hex::encode(bytes)),
        Value::Text(s) => {
            let s = s.trim();
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            hex::decode(digits)
                .map(hex::encode)
                .map_err(|e| e.to_string())
        }
        other => Err(format!("{} is not a blob", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(boolean(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(boolean(&Value::from("FALSE")).unwrap(), "false");
        assert!(boolean(&Value::from("yes")).is_err());
        assert!(boolean(&Value::Int(1)).is_err());
    }

    #[test]
    fn uuids_are_canonical() {
        assert_eq!(
            uuid(&Value::from("550E8400-E29B-41D4-A716-446655440000")).unwrap(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert!(uuid(&Value::from("nope")).is_err());
    }

    #[test]
    fn addresses_are_normalized() {
        assert_eq!(
            inet(&Value::Inet(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))).unwrap(),
            "10.0.0.1"
        );
        assert_eq!(
            inet(&Value::from("2001:0db8:0000:0000:0000:0000:0000:0001")).unwrap(),
            "2001:db8::1"
        );
        assert_eq!(inet(&Value::from("::1")).unwrap(), "::1");
        assert!(inet(&Value::from("256.1.1.1")).is_err());
        assert!(inet(&Value::from("example.com")).is_err());
    }

    #[test]
    fn blobs_become_lower_hex() {
        assert_eq!(blob(&Value::Bytes(vec![0xCA, 0xFE])).unwrap(), "cafe");
        assert_eq!(blob(&Value::from("0xCAFE")).unwrap(), "cafe");
        assert!(blob(&Value::from("abc")).is_err());
        assert!(blob(&Value::from("zz")).is_err());
    }

    #[test]
    fn stringify_renders_scalars() {
        assert_eq!(stringify(&Value::from("Ann")), "Ann");
        assert_eq!(stringify(&Value::Int(3)), "3");
        assert_eq!(stringify(&Value::Bool(false)), "false");
    }
}
