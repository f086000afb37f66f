//! Reading conditions from JSON.
//!
//! Every condition is a JSON object whose `type` member selects a parser from
//! a tag table. The remaining members are read into a per-type document that
//! rejects unknown fields, then converted into a [`Condition`].

use celldex_data::Value;
use num_bigint::BigInt;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value as Json};

use crate::{
    Condition, DEFAULT_BOOST, DEFAULT_MAX_EDITS, DEFAULT_MAX_EXPANSIONS, DEFAULT_PREFIX_LENGTH,
    QueryError,
};

/// Parses the members of one condition type.
type ParseFn = fn(Map<String, Json>) -> Result<Condition, QueryError>;

/// Condition type tags and their parsers. The tags are a stable wire format.
const PARSERS: &[(&str, ParseFn)] = &[
    ("all", parse_all),
    ("boolean", parse_boolean),
    ("contains", parse_contains),
    ("fuzzy", parse_fuzzy),
    ("lucene", parse_raw),
    ("match", parse_match),
    ("phrase", parse_phrase),
    ("prefix", parse_prefix),
    ("range", parse_range),
    ("raw", parse_raw),
    ("regexp", parse_regexp),
    ("wildcard", parse_wildcard),
];

/// Every accepted condition type tag.
pub const CONDITION_TYPES: &[&str] = &[
    "all", "boolean", "contains", "fuzzy", "lucene", "match", "phrase", "prefix", "range", "raw",
    "regexp", "wildcard",
];

impl Condition {
    /// Parses a condition from a JSON string.
    pub fn parse(json: &str) -> Result<Self, QueryError> {
        let doc: Json = serde_json::from_str(json)?;
        Self::from_json(&doc)
    }

    /// Builds a condition from a parsed JSON document.
    pub fn from_json(doc: &Json) -> Result<Self, QueryError> {
        let Json::Object(members) = doc else {
            return Err(QueryError::configuration(
                "condition",
                format!("expected an object, found {doc}"),
            ));
        };

        let mut members = members.clone();
        let tag = match members.remove("type") {
            Some(Json::String(tag)) => tag,
            Some(other) => {
                return Err(QueryError::configuration(
                    "condition",
                    format!("`type` must be a string, found {other}"),
                ));
            }
            None => return Err(QueryError::configuration("condition", "missing `type`")),
        };

        let parse = PARSERS
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, parse)| parse)
            .ok_or_else(|| QueryError::UnknownType { tag: tag.clone() })?;
        parse(members)
    }
}

/// Converts a JSON scalar into a [`Value`].
///
/// Integers that do not fit an `i64` become [`Value::Varint`]. Arrays and
/// objects are rejected.
pub fn value_from_json(json: &Json) -> Result<Value, QueryError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Varint(BigInt::from(u)))
            } else {
                n.as_f64().map(Value::Float).ok_or_else(|| {
                    QueryError::configuration("value", format!("unrepresentable number {n}"))
                })
            }
        }
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Array(_) | Json::Object(_) => Err(QueryError::configuration(
            "value",
            format!("expected a scalar, found {json}"),
        )),
    }
}

/// Reads the members of a condition type into its document.
fn read_members<T: DeserializeOwned>(
    tag: &str,
    members: Map<String, Json>,
) -> Result<T, QueryError> {
    serde_json::from_value(Json::Object(members))
        .map_err(|e| QueryError::configuration(format!("{tag} condition"), e))
}

/// Converts a required scalar member.
fn required_value(tag: &str, json: &Json) -> Result<Value, QueryError> {
    match value_from_json(json)? {
        Value::Null => Err(QueryError::configuration(
            format!("{tag} condition"),
            "`value` is required",
        )),
        value => Ok(value),
    }
}

/// Converts an optional bound member; `null` means open.
fn bound(json: &Json) -> Result<Option<Value>, QueryError> {
    Ok(Some(value_from_json(json)?).filter(|v| !v.is_null()))
}

/// Converts a list of child condition documents.
fn children(docs: &[Json]) -> Result<Vec<Condition>, QueryError> {
    docs.iter().map(Condition::from_json).collect()
}

/// Serde default for boosts.
fn default_boost() -> f32 {
    DEFAULT_BOOST
}

/// Serde default for fuzzy edit distance.
fn default_max_edits() -> u8 {
    DEFAULT_MAX_EDITS
}

/// Serde default for fuzzy exact prefix length.
fn default_prefix_length() -> usize {
    DEFAULT_PREFIX_LENGTH
}

/// Serde default for fuzzy expansion cap.
fn default_max_expansions() -> usize {
    DEFAULT_MAX_EXPANSIONS
}

/// Serde default for flags that are on unless disabled.
fn default_true() -> bool {
    true
}

/// Members of an `all` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AllDoc {
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `boolean` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BooleanDoc {
    /// Required children.
    #[serde(default)]
    must: Vec<Json>,
    /// Optional children.
    #[serde(default)]
    should: Vec<Json>,
    /// Excluded children.
    #[serde(default, alias = "not")]
    must_not: Vec<Json>,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `match` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MatchDoc {
    /// Target field.
    field: String,
    /// Value to match.
    #[serde(default)]
    value: Json,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `contains` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ContainsDoc {
    /// Target field.
    field: String,
    /// Candidate values.
    values: Vec<Json>,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `range` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeDoc {
    /// Target field.
    field: String,
    /// Lower bound.
    #[serde(default)]
    lower: Json,
    /// Upper bound.
    #[serde(default)]
    upper: Json,
    /// Whether the lower bound matches.
    #[serde(default)]
    include_lower: bool,
    /// Whether the upper bound matches.
    #[serde(default)]
    include_upper: bool,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `phrase` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PhraseDoc {
    /// Target field.
    field: String,
    /// Terms in order.
    values: Vec<String>,
    /// Allowed position moves.
    #[serde(default)]
    slop: u32,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of the single-pattern conditions: prefix, wildcard and regexp.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternDoc {
    /// Target field.
    field: String,
    /// Raw pattern.
    value: String,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `fuzzy` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FuzzyDoc {
    /// Target field.
    field: String,
    /// Value to compare against.
    value: String,
    /// Maximum edit distance.
    #[serde(default = "default_max_edits")]
    max_edits: u8,
    /// Exact leading characters.
    #[serde(default = "default_prefix_length")]
    prefix_length: usize,
    /// Expansion cap.
    #[serde(default = "default_max_expansions")]
    max_expansions: usize,
    /// Transpositions count as one edit.
    #[serde(default = "default_true")]
    transpositions: bool,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Members of a `raw` condition.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDoc {
    /// Field for unqualified terms.
    #[serde(default)]
    default_field: Option<String>,
    /// Query string.
    #[serde(alias = "query")]
    syntax: String,
    /// Score multiplier.
    #[serde(default = "default_boost")]
    boost: f32,
}

/// Parses an `all` condition.
fn parse_all(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let AllDoc { boost } = read_members("all", doc)?;
    Ok(Condition::All { boost })
}

/// Parses a `boolean` condition, recursing into its children.
fn parse_boolean(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let doc: BooleanDoc = read_members("boolean", doc)?;
    Ok(Condition::Boolean {
        must: children(&doc.must)?,
        should: children(&doc.should)?,
        must_not: children(&doc.must_not)?,
        boost: doc.boost,
    })
}

/// Parses a `match` condition.
fn parse_match(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let doc: MatchDoc = read_members("match", doc)?;
    Ok(Condition::Match {
        value: required_value("match", &doc.value)?,
        field: doc.field,
        boost: doc.boost,
    })
}

/// Parses a `contains` condition.
fn parse_contains(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let doc: ContainsDoc = read_members("contains", doc)?;
    let values = doc
        .values
        .iter()
        .map(|v| required_value("contains", v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Condition::Contains {
        field: doc.field,
        values,
        boost: doc.boost,
    })
}

/// Parses a `range` condition.
fn parse_range(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let doc: RangeDoc = read_members("range", doc)?;
    Ok(Condition::Range {
        lower: bound(&doc.lower)?,
        upper: bound(&doc.upper)?,
        field: doc.field,
        include_lower: doc.include_lower,
        include_upper: doc.include_upper,
        boost: doc.boost,
    })
}

/// Parses a `phrase` condition.
fn parse_phrase(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let PhraseDoc {
        field,
        values,
        slop,
        boost,
    } = read_members("phrase", doc)?;
    Ok(Condition::Phrase {
        field,
        values,
        slop,
        boost,
    })
}

/// Parses a `prefix` condition.
fn parse_prefix(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let PatternDoc {
        field,
        value,
        boost,
    } = read_members("prefix", doc)?;
    Ok(Condition::Prefix {
        field,
        value,
        boost,
    })
}

/// Parses a `wildcard` condition.
fn parse_wildcard(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let PatternDoc {
        field,
        value,
        boost,
    } = read_members("wildcard", doc)?;
    Ok(Condition::Wildcard {
        field,
        value,
        boost,
    })
}

/// Parses a `regexp` condition.
fn parse_regexp(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let PatternDoc {
        field,
        value,
        boost,
    } = read_members("regexp", doc)?;
    Ok(Condition::Regexp {
        field,
        value,
        boost,
    })
}

/// Parses a `fuzzy` condition.
fn parse_fuzzy(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let doc: FuzzyDoc = read_members("fuzzy", doc)?;
    Ok(Condition::Fuzzy {
        field: doc.field,
        value: doc.value,
        max_edits: doc.max_edits,
        prefix_length: doc.prefix_length,
        max_expansions: doc.max_expansions,
        transpositions: doc.transpositions,
        boost: doc.boost,
    })
}

/// Parses a `raw` (or `lucene`) condition.
fn parse_raw(doc: Map<String, Json>) -> Result<Condition, QueryError> {
    let RawDoc {
        default_field,
        syntax,
        boost,
    } = read_members("raw", doc)?;
    Ok(Condition::RawQuery {
        default_field,
        syntax,
        boost,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tag_table_matches_public_list() {
        let tags: Vec<_> = PARSERS.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, CONDITION_TYPES);
    }

    #[test]
    fn match_defaults_boost() {
        let cond = Condition::from_json(&json!({
            "type": "match", "field": "age", "value": 42
        }))
        .unwrap();
        assert_eq!(cond, Condition::Match {
            field: "age".into(),
            value: Value::Int(42),
            boost: 1.0,
        });
    }

    #[test]
    fn match_requires_value() {
        let err = Condition::from_json(&json!({"type": "match", "field": "age"})).unwrap_err();
        assert!(err.to_string().contains("`value` is required"), "{err}");

        let err = Condition::from_json(&json!({"type": "match", "field": "age", "value": null}))
            .unwrap_err();
        assert!(matches!(err, QueryError::Configuration { .. }));
    }

    #[test]
    fn range_with_open_upper_bound() {
        let cond = Condition::from_json(&json!({
            "type": "range",
            "field": "age",
            "lower": 42,
            "upper": null,
            "include_lower": true,
            "include_upper": false
        }))
        .unwrap();
        assert_eq!(cond, Condition::Range {
            field: "age".into(),
            lower: Some(Value::Int(42)),
            upper: None,
            include_lower: true,
            include_upper: false,
            boost: 1.0,
        });
    }

    #[test]
    fn boolean_accepts_not_alias_and_nests() {
        let cond = Condition::from_json(&json!({
            "type": "boolean",
            "boost": 0.5,
            "must": [{"type": "match", "field": "name", "value": "ann", "boost": 2.0}],
            "not": [{"type": "prefix", "field": "city", "value": "par"}]
        }))
        .unwrap();

        let Condition::Boolean {
            must,
            should,
            must_not,
            boost,
        } = cond
        else {
            panic!("expected boolean");
        };
        assert_eq!(boost, 0.5);
        assert_eq!(must[0].boost(), 2.0);
        assert!(should.is_empty());
        assert_eq!(must_not, vec![Condition::prefix("city", "par")]);
    }

    #[test]
    fn fuzzy_fills_defaults() {
        let cond = Condition::parse(r#"{"type": "fuzzy", "field": "name", "value": "ann"}"#).unwrap();
        assert_eq!(cond, Condition::fuzzy("name", "ann"));
    }

    #[test]
    fn raw_accepts_lucene_tag_and_query_alias() {
        let cond = Condition::from_json(&json!({
            "type": "lucene", "default_field": "body", "query": "rust AND search"
        }))
        .unwrap();
        assert_eq!(
            cond,
            Condition::raw(Some("body".into()), "rust AND search")
        );
    }

    #[test]
    fn unknown_type_is_rejected_with_suggestion() {
        let err = Condition::from_json(&json!({"type": "geo_distance"})).unwrap_err();
        assert!(matches!(&err, QueryError::UnknownType { tag } if tag == "geo_distance"));
        assert!(err.suggestion().unwrap().contains("wildcard"));
    }

    #[test]
    fn unknown_member_is_rejected() {
        let err = Condition::from_json(&json!({
            "type": "prefix", "field": "city", "value": "p", "slop": 2
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{err}");
    }

    #[test]
    fn nested_errors_surface() {
        let err = Condition::from_json(&json!({
            "type": "boolean", "should": [{"type": "nope"}]
        }))
        .unwrap_err();
        assert!(matches!(err, QueryError::UnknownType { .. }));
    }

    #[test]
    fn json_scalars_convert() {
        assert_eq!(value_from_json(&json!(null)).unwrap(), Value::Null);
        assert_eq!(value_from_json(&json!(-3)).unwrap(), Value::Int(-3));
        assert_eq!(value_from_json(&json!(1.5)).unwrap(), Value::Float(1.5));
        assert_eq!(
            value_from_json(&json!(u64::MAX)).unwrap(),
            Value::Varint(BigInt::from(u64::MAX))
        );
        assert!(value_from_json(&json!([1])).is_err());
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = Condition::from_json(&json!({"field": "x"})).unwrap_err();
        assert!(err.to_string().contains("missing `type`"));
        assert!(Condition::from_json(&json!("match")).is_err());
    }
}
