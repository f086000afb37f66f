//! Date encoding to epoch milliseconds.
//!
//! Patterns use the familiar `yyyy/MM/dd HH:mm:ss.SSS` letter syntax and are
//! translated once into a chrono format string. Parsing is stateless.

use celldex_data::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::IndexError;

/// Encodes dates as milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateEncoder {
    /// Pattern as configured.
    pattern: String,
    /// Equivalent chrono format string.
    format: String,
    /// Whether the pattern carries a zone offset.
    zoned: bool,
}

impl DateEncoder {
    /// Pattern used when none is configured.
    pub const DEFAULT_PATTERN: &'static str = "yyyy/MM/dd HH:mm:ss.SSS";

    /// Creates an encoder for `pattern`.
    pub fn new(pattern: &str) -> Result<Self, IndexError> {
        let format = translate(pattern)?;
        let zoned = format.contains("%z") || format.contains("%:z");
        Ok(Self {
            pattern: pattern.to_string(),
            format,
            zoned,
        })
    }

    /// Pattern as configured.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Chrono format string the pattern translates to.
    pub fn chrono_format(&self) -> &str {
        &self.format
    }

    /// Encodes `value` as epoch milliseconds.
    pub fn encode(&self, field: &str, value: &Value) -> Result<i64, IndexError> {
        let invalid = |reason: String| IndexError::invalid_value(field, "date", value, reason);
        match value {
            Value::Timestamp(millis) | Value::Int(millis) => Ok(*millis),
            Value::Float(millis) => Ok(*millis as i64),
            Value::Uuid(uuid) => {
                let timestamp = uuid
                    .get_timestamp()
                    .ok_or_else(|| invalid("uuid is not time-based".into()))?;
                let (secs, nanos) = timestamp.to_unix();
                let secs = i64::try_from(secs).map_err(|_| invalid("uuid time overflows".into()))?;
                Ok(secs * 1000 + i64::from(nanos / 1_000_000))
            }
            Value::Text(s) => self
                .parse(s.trim())
                .ok_or_else(|| invalid(format!("does not match pattern '{}'", self.pattern))),
            other => Err(invalid(format!("{} is not a date", other.kind()))),
        }
    }

    /// Parses `s` with the pattern, in UTC unless the pattern carries a zone.
    pub fn parse(&self, s: &str) -> Option<i64> {
        if self.zoned {
            return DateTime::parse_from_str(s, &self.format)
                .ok()
                .map(|dt| dt.timestamp_millis());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, &self.format) {
            return Some(dt.and_utc().timestamp_millis());
        }
        NaiveDate::parse_from_str(s, &self.format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
    }

    /// Formats epoch milliseconds with the pattern, in UTC.
    pub fn format(&self, millis: i64) -> Option<String> {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|dt| dt.format(&self.format).to_string())
    }
}

/// Translates a date pattern into a chrono format string.
fn translate(pattern: &str) -> Result<String, IndexError> {
    let unsupported = |what: String| {
        IndexError::Configuration(format!("unsupported date pattern '{pattern}': {what}"))
    };

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            let end = chars[i + 1..]
                .iter()
                .position(|&q| q == '\'')
                .ok_or_else(|| unsupported("unterminated quote".into()))?;
            if end == 0 {
                out.push('\'');
            }
            for &literal in &chars[i + 1..i + 1 + end] {
                push_literal(&mut out, literal);
            }
            i += end + 2;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('H', _) => "%H",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', 3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('Z' | 'X', 1 | 2) => "%z",
            ('X', 3) => "%:z",
            _ => return Err(unsupported(format!("'{}'", c.to_string().repeat(run)))),
        };
        out.push_str(spec);
        i += run;
    }
    Ok(out)
}

/// Appends a literal character, escaping `%`.
fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
