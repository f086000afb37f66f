//! Keyed terms for single entries of collection columns.
//!
//! A cell addressed as `column.key` is indexed twice: under the column's
//! field, where any entry of the column matches, and under the column's
//! hidden entries field as terms prefixed with the key. Numbers become
//! fixed-width hex whose byte order follows numeric order, so a range over
//! one key is a term range.

use std::ops::Bound;

use tantivy::tokenizer::{PreTokenizedString, Token};

use crate::IndexValue;

/// Separates the key from the value in an entry term.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// The character after [`KEY_SEPARATOR`], bounding the terms of one key.
const KEY_END: char = '\u{20}';

/// Prefix of the hidden field holding a mapped field's keyed entries.
pub const ENTRIES_PREFIX: &str = "_entries.";

/// Sign bit of a 64-bit word.
const SIGN: u64 = 1 << 63;

/// Name of the entries field of `field`.
pub fn entries_field_name(field: &str) -> String {
    format!("{ENTRIES_PREFIX}{field}")
}

/// The prefix shared by every term of `key`.
pub fn key_prefix(key: &str) -> String {
    format!("{key}{KEY_SEPARATOR}")
}

/// The entry term of one token under `key`.
pub fn entry_term(key: &str, token: &str) -> String {
    format!("{key}{KEY_SEPARATOR}{token}")
}

/// Renders a single-term index value as the token stored under a key.
///
/// Returns `None` for multi-term values.
pub fn value_token(value: &IndexValue) -> Option<String> {
    match value {
        IndexValue::String(s) => Some(s.clone()),
        IndexValue::Integer(v) => Some(ordered_i64(i64::from(*v))),
        IndexValue::Long(v) => Some(ordered_i64(*v)),
        IndexValue::Float(v) => Some(ordered_f64(f64::from(*v))),
        IndexValue::Double(v) => Some(ordered_f64(*v)),
        IndexValue::Terms(_) => None,
    }
}

/// Hex of an `i64` with the sign bit flipped.
fn ordered_i64(v: i64) -> String {
    format!("{:016x}", (v as u64) ^ SIGN)
}

/// Hex of an `f64` whose byte order follows numeric order. Negative zero
/// folds into zero.
fn ordered_f64(v: f64) -> String {
    let bits = if v == 0.0 { 0 } else { v.to_bits() };
    let ordered = if bits & SIGN == 0 { bits | SIGN } else { !bits };
    format!("{ordered:016x}")
}

/// Prefixes analyzed or encoded tokens with `key`.
pub fn keyed_tokens(key: &str, text: &str, tokens: Vec<Token>) -> PreTokenizedString {
    let tokens = tokens
        .into_iter()
        .map(|token| Token {
            text: entry_term(key, &token.text),
            ..token
        })
        .collect();
    PreTokenizedString {
        text: text.to_string(),
        tokens,
    }
}

/// One token per term, at consecutive positions.
pub fn plain_tokens(terms: impl IntoIterator<Item = String>) -> Vec<Token> {
    terms
        .into_iter()
        .enumerate()
        .map(|(position, text)| Token {
            position,
            text,
            ..Token::default()
        })
        .collect()
}

/// Term bounds selecting the values of `key` between two value bounds.
///
/// Open bounds stop at the first and last term of the key. Returns `None`
/// when a bound holds a multi-term value.
pub fn key_bounds(
    key: &str,
    lower: &Bound<IndexValue>,
    upper: &Bound<IndexValue>,
) -> Option<(Bound<String>, Bound<String>)> {
    let lower = match lower {
        Bound::Included(v) => Bound::Included(entry_term(key, &value_token(v)?)),
        Bound::Excluded(v) => Bound::Excluded(entry_term(key, &value_token(v)?)),
        Bound::Unbounded => Bound::Included(key_prefix(key)),
    };
    let upper = match upper {
        Bound::Included(v) => Bound::Included(entry_term(key, &value_token(v)?)),
        Bound::Excluded(v) => Bound::Excluded(entry_term(key, &value_token(v)?)),
        Bound::Unbounded => Bound::Excluded(format!("{key}{KEY_END}")),
    };
    Some((lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: IndexValue) -> String {
        value_token(&value).unwrap()
    }

    #[test]
    fn integer_tokens_follow_numeric_order() {
        let values = [i64::MIN, -1_000, -1, 0, 1, 42, i64::MAX];
        let tokens: Vec<String> = values.iter().map(|v| token(IndexValue::Long(*v))).collect();
        let mut sorted = tokens.clone();
        sorted.sort();
        assert_eq!(tokens, sorted);
        assert_eq!(token(IndexValue::Integer(42)), token(IndexValue::Long(42)));
    }

    #[test]
    fn float_tokens_follow_numeric_order() {
        let values = [f64::NEG_INFINITY, -2.5, -0.1, 0.0, 0.1, 3.0, f64::INFINITY];
        let tokens: Vec<String> = values.iter().map(|v| token(IndexValue::Double(*v))).collect();
        let mut sorted = tokens.clone();
        sorted.sort();
        assert_eq!(tokens, sorted);
        assert_eq!(token(IndexValue::Double(-0.0)), token(IndexValue::Double(0.0)));
    }

    #[test]
    fn open_bounds_cover_exactly_one_key() {
        let (lower, upper) = key_bounds("h", &Bound::Unbounded, &Bound::Unbounded).unwrap();
        let inside = entry_term("h", "zzz");
        let other = entry_term("ha", "000");
        let in_range = |term: &String| {
            let above = match &lower {
                Bound::Included(l) => term >= l,
                _ => unreachable!(),
            };
            let below = match &upper {
                Bound::Excluded(u) => term < u,
                _ => unreachable!(),
            };
            above && below
        };
        assert!(in_range(&inside));
        assert!(!in_range(&other));
    }

    #[test]
    fn multi_term_bounds_are_rejected() {
        let terms = Bound::Included(IndexValue::Terms(vec!["a".into()]));
        assert!(key_bounds("k", &terms, &Bound::Unbounded).is_none());
    }

    #[test]
    fn keyed_tokens_keep_positions() {
        let tokens = plain_tokens(["a".to_string(), "b".to_string()]);
        let keyed = keyed_tokens("k", "a b", tokens);
        assert_eq!(keyed.tokens[1].position, 1);
        assert_eq!(keyed.tokens[1].text, entry_term("k", "b"));
    }
}
