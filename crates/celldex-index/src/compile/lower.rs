//! Lowering of compiled queries to tantivy queries.
//!
//! Names addressing one entry of a collection field query that field's
//! entries field, with every term prefixed by the entry key.

use std::ops::Bound;

use celldex_query::DEFAULT_BOOST;
use tantivy::{
    Term,
    query::{
        AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, FuzzyTermQuery, Occur, PhraseQuery,
        Query, QueryParser, RangeQuery, RegexQuery, TermQuery,
    },
    schema::{Field, IndexRecordOption},
};

use super::{CompiledQuery, QueryKind};
use crate::{
    BaseType, FieldPath, IndexError, IndexValue, MappedField, Schema,
    entry::{entries_field_name, entry_term, key_bounds, key_prefix},
};

impl CompiledQuery {
    /// Builds the tantivy query for this tree.
    pub fn to_query(&self, schema: &Schema) -> Result<Box<dyn Query>, IndexError> {
        let query = lower(&self.kind, schema)?;
        if self.boost == DEFAULT_BOOST {
            Ok(query)
        } else {
            Ok(Box::new(BoostQuery::new(query, self.boost)))
        }
    }
}

/// A field and key that terms are built for.
struct TermTarget<'a> {
    /// Tantivy field holding the terms.
    field: Field,
    /// Entry key prefixed to every term, if any.
    key: Option<&'a str>,
    /// Owning mapping.
    mapped: &'a MappedField,
}

impl<'a> TermTarget<'a> {
    /// Resolves a compiled field name.
    fn new(schema: &'a Schema, name: &'a str) -> Result<Self, IndexError> {
        let FieldPath { mapped, key } = schema.path(name)?;
        let field = match key {
            None => mapped.field,
            Some(_) => mapped.entries.ok_or_else(|| {
                IndexError::unsupported(name, mapped.mapper.type_name(), "entry lookup")
            })?,
        };
        Ok(Self { field, key, mapped })
    }

    /// The term text for one token.
    fn text(&self, token: &str) -> String {
        match self.key {
            Some(key) => entry_term(key, token),
            None => token.to_string(),
        }
    }

    /// A term of this target.
    fn term(&self, token: &str) -> Term {
        Term::from_field_text(self.field, &self.text(token))
    }

    /// Anchors a term regex behind the entry key.
    fn pattern(&self, pattern: &str) -> String {
        match self.key {
            Some(key) => format!("{}(?:{pattern})", regex::escape(&key_prefix(key))),
            None => pattern.to_string(),
        }
    }
}

/// Lowers one query shape, without its boost.
fn lower(kind: &QueryKind, schema: &Schema) -> Result<Box<dyn Query>, IndexError> {
    Ok(match kind {
        QueryKind::All => Box::new(AllQuery),
        QueryKind::Boolean {
            must,
            should,
            must_not,
        } => {
            let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for (occur, group) in [
                (Occur::Must, must),
                (Occur::Should, should),
                (Occur::MustNot, must_not),
            ] {
                for child in group {
                    clauses.push((occur, child.to_query(schema)?));
                }
            }
            if clauses.is_empty() {
                return Ok(Box::new(AllQuery));
            }
            if must.is_empty() && should.is_empty() {
                clauses.push((Occur::Must, Box::new(AllQuery)));
            }
            Box::new(BooleanQuery::new(clauses))
        }
        QueryKind::Term { field, term } => Box::new(TermQuery::new(
            TermTarget::new(schema, field)?.term(term),
            IndexRecordOption::WithFreqs,
        )),
        QueryKind::Range {
            field,
            lower,
            upper,
        } => range(&TermTarget::new(schema, field)?, lower, upper)?,
        QueryKind::Phrase { field, terms, slop } => {
            let target = TermTarget::new(schema, field)?;
            let mut terms: Vec<Term> = terms.iter().map(|t| target.term(t)).collect();
            if terms.len() == 1 {
                let term = terms.remove(0);
                Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
            } else {
                let mut phrase = PhraseQuery::new(terms);
                phrase.set_slop(*slop);
                Box::new(phrase)
            }
        }
        QueryKind::Prefix { field, value } => {
            let target = TermTarget::new(schema, field)?;
            regex_query(&target, &format!("{}.*", regex::escape(value)))?
        }
        QueryKind::Wildcard { field, value } => {
            regex_query(&TermTarget::new(schema, field)?, &glob_to_regex(value))?
        }
        QueryKind::Regexp { field, value } => {
            regex_query(&TermTarget::new(schema, field)?, value)?
        }
        QueryKind::Fuzzy {
            field,
            value,
            max_edits,
            prefix_length,
            transpositions,
            ..
        } => {
            let target = TermTarget::new(schema, field)?;
            let fuzzy: Box<dyn Query> = Box::new(FuzzyTermQuery::new(
                target.term(value),
                *max_edits,
                *transpositions,
            ));
            if *prefix_length == 0 && target.key.is_none() {
                fuzzy
            } else {
                let prefix: String = value.chars().take(*prefix_length).collect();
                let anchor = regex_query(&target, &format!("{}.*", regex::escape(&prefix)))?;
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, fuzzy),
                    (Occur::Must, Box::new(ConstScoreQuery::new(anchor, 0.0))),
                ]))
            }
        }
        QueryKind::Raw {
            default_fields,
            syntax,
        } => {
            let fields: Vec<Field> = default_fields
                .iter()
                .map(|name| schema.resolve(name).map(|mapped| mapped.field))
                .collect::<Result<_, _>>()?;
            let parser = QueryParser::new(
                schema.tantivy_schema().clone(),
                fields,
                schema.tokenizers()?,
            );
            parser
                .parse_query(syntax)
                .map_err(|source| IndexError::QuerySyntax {
                    syntax: syntax.clone(),
                    source,
                })?
        }
    })
}

/// Builds a regular expression query over a target's terms.
fn regex_query(target: &TermTarget<'_>, pattern: &str) -> Result<Box<dyn Query>, IndexError> {
    let mapped = target.mapped;
    RegexQuery::from_pattern(&target.pattern(pattern), target.field)
        .map(|query| Box::new(query) as Box<dyn Query>)
        .map_err(|e| {
            IndexError::invalid_value(&mapped.name, mapped.mapper.type_name(), pattern, e.to_string())
        })
}

/// Translates a glob with `*` and `?` into an anchored term regex.
fn glob_to_regex(glob: &str) -> String {
    let mut pattern = String::with_capacity(glob.len() * 2);
    let mut literal = String::new();
    for c in glob.chars() {
        match c {
            '*' | '?' => {
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                pattern.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    pattern.push_str(&regex::escape(&literal));
    pattern
}

/// Builds a range query typed by the field's base type. Entry ranges are
/// term ranges over the key's encoded values.
fn range(
    target: &TermTarget<'_>,
    lower: &Bound<IndexValue>,
    upper: &Bound<IndexValue>,
) -> Result<Box<dyn Query>, IndexError> {
    let mapped = target.mapped;
    let mismatch = || IndexError::mismatch(&mapped.name, "range bound does not match field type");
    if let Some(key) = target.key {
        let (lower, upper) = key_bounds(key, lower, upper).ok_or_else(mismatch)?;
        return Ok(Box::new(RangeQuery::new_str_bounds(
            entries_field_name(&mapped.name),
            bound_str(&lower),
            bound_str(&upper),
        )));
    }

    let name = mapped.name.clone();
    Ok(match mapped.mapper.base_type() {
        BaseType::String => {
            let lower = convert_bound(lower, IndexValue::as_str).ok_or_else(mismatch)?;
            let upper = convert_bound(upper, IndexValue::as_str).ok_or_else(mismatch)?;
            Box::new(RangeQuery::new_str_bounds(name, lower, upper))
        }
        BaseType::Integer | BaseType::Long => {
            let lower = convert_bound(lower, IndexValue::as_i64).ok_or_else(mismatch)?;
            let upper = convert_bound(upper, IndexValue::as_i64).ok_or_else(mismatch)?;
            Box::new(RangeQuery::new_i64_bounds(name, lower, upper))
        }
        BaseType::Float | BaseType::Double => {
            let lower = convert_bound(lower, IndexValue::as_f64).ok_or_else(mismatch)?;
            let upper = convert_bound(upper, IndexValue::as_f64).ok_or_else(mismatch)?;
            Box::new(RangeQuery::new_f64_bounds(name, lower, upper))
        }
    })
}

/// Borrows the text of an owned bound.
fn bound_str(bound: &Bound<String>) -> Bound<&str> {
    bound.as_ref().map(String::as_str)
}

/// Converts a bound's value, returning `None` if the value has another type.
fn convert_bound<'a, T>(
    bound: &'a Bound<IndexValue>,
    convert: impl Fn(&'a IndexValue) -> Option<T>,
) -> Option<Bound<T>> {
    Some(match bound {
        Bound::Included(v) => Bound::Included(convert(v)?),
        Bound::Excluded(v) => Bound::Excluded(convert(v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

#[cfg(test)]
mod tests {
    use celldex_query::Condition;

    use super::*;
    use crate::{FieldEncoder, Mapper, QueryCompiler};

    fn schema() -> Schema {
        Schema::builder()
            .field("name", Mapper::new(FieldEncoder::String {
                case_sensitive: true,
            }))
            .field("bio", Mapper::new(FieldEncoder::Text {
                analyzer: "standard".into(),
            }))
            .field("age", Mapper::new(FieldEncoder::Integer))
            .build()
            .unwrap()
    }

    fn build(condition: &Condition) -> Result<Box<dyn Query>, IndexError> {
        let schema = schema();
        QueryCompiler::new(&schema)
            .compile(condition)?
            .to_query(&schema)
    }

    #[test]
    fn glob_translation_escapes_literals() {
        assert_eq!(glob_to_regex("a*b?c"), "a.*b.c");
        assert_eq!(glob_to_regex("1.0*"), r"1\.0.*");
        assert_eq!(glob_to_regex("plain"), "plain");
    }

    #[test]
    fn every_condition_lowers() {
        let conditions = [
            Condition::all(),
            Condition::boolean(),
            Condition::boolean().must_not(Condition::matching("name", "x")),
            Condition::matching("age", 3).with_boost(2.0),
            Condition::range("age", Some(1.into()), Some(9.into())),
            Condition::range("name", Some("a".into()), None),
            Condition::phrase("bio", ["quick fox"]),
            Condition::phrase("bio", ["fox"]),
            Condition::prefix("name", "a+b"),
            Condition::wildcard("name", "a*"),
            Condition::fuzzy("name", "rust"),
            Condition::Fuzzy {
                field: "name".into(),
                value: "rust".into(),
                max_edits: 1,
                prefix_length: 2,
                max_expansions: 50,
                transpositions: true,
                boost: 1.0,
            },
            Condition::raw(None, "bio:fox"),
            Condition::matching("age.k", 3),
            Condition::range("age.k", None, Some(9.into())),
            Condition::matching("name.k", "x"),
            Condition::prefix("name.k", "a"),
            Condition::fuzzy("name.k", "rust"),
            Condition::phrase("bio.k", ["quick fox"]),
        ];
        for condition in &conditions {
            assert!(build(condition).is_ok(), "{condition:?}");
        }
    }

    #[test]
    fn invalid_regex_is_invalid_value() {
        let condition = Condition::Regexp {
            field: "name".into(),
            value: "(".into(),
            boost: 1.0,
        };
        assert!(matches!(
            build(&condition),
            Err(IndexError::InvalidValue { .. })
        ));
    }

    #[test]
    fn bad_raw_syntax_is_query_syntax() {
        assert!(matches!(
            build(&Condition::raw(None, "nosuchfield:x")),
            Err(IndexError::QuerySyntax { .. })
        ));
    }
}
