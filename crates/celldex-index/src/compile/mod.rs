//! Condition compilation.
//!
//! [`QueryCompiler`] resolves every field of a condition tree through the
//! [`Schema`], coerces values with the field's mapper and produces a
//! [`CompiledQuery`]: an inspectable tree that lowers to a tantivy query.
//! Compilation is all-or-nothing.
//!
//! Each compiled node carries only the boost its own condition declared.
//! Boosts of enclosing conditions are applied by wrapping, never folded into
//! children.

mod lower;

use std::{fmt, ops::Bound};

use celldex_data::Value;
use celldex_query::{Condition, DEFAULT_BOOST};
use tracing::trace;

use crate::{FieldEncoder, IndexError, IndexValue, MappedField, Schema};

/// A compiled condition: a query shape and its own boost.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Query shape.
    pub kind: QueryKind,
    /// Score multiplier declared by the source condition.
    pub boost: f32,
}

/// Shape of a compiled query. Field names are as written in the condition:
/// a mapped field, or a mapped collection field followed by an entry key.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// Every document.
    All,
    /// Boolean combination of sub-queries.
    Boolean {
        /// Required clauses.
        must: Vec<CompiledQuery>,
        /// Optional clauses; one is required when `must` is empty.
        should: Vec<CompiledQuery>,
        /// Excluded clauses.
        must_not: Vec<CompiledQuery>,
    },
    /// One exact term.
    Term {
        /// Target field.
        field: String,
        /// Encoded or analyzed term.
        term: String,
    },
    /// Values between two bounds of the field's base type.
    Range {
        /// Target field.
        field: String,
        /// Lower bound.
        lower: Bound<IndexValue>,
        /// Upper bound.
        upper: Bound<IndexValue>,
    },
    /// Terms in order, within `slop` moves.
    Phrase {
        /// Target field.
        field: String,
        /// Terms in order.
        terms: Vec<String>,
        /// Allowed position moves.
        slop: u32,
    },
    /// Terms starting with a raw prefix.
    Prefix {
        /// Target field.
        field: String,
        /// Prefix.
        value: String,
    },
    /// Terms matching a glob pattern.
    Wildcard {
        /// Target field.
        field: String,
        /// Pattern with `*` and `?`.
        value: String,
    },
    /// Terms matching a regular expression.
    Regexp {
        /// Target field.
        field: String,
        /// Regular expression.
        value: String,
    },
    /// Terms within an edit distance.
    Fuzzy {
        /// Target field.
        field: String,
        /// Value to compare against.
        value: String,
        /// Maximum Levenshtein distance.
        max_edits: u8,
        /// Leading characters that must match exactly.
        prefix_length: usize,
        /// Cap on expanded terms. Carried but not enforced by the engine.
        max_expansions: usize,
        /// Whether a transposition is one edit.
        transpositions: bool,
    },
    /// A query string for the engine's own parser.
    Raw {
        /// Fields searched by unqualified terms.
        default_fields: Vec<String>,
        /// Query string.
        syntax: String,
    },
}

impl CompiledQuery {
    /// Wraps a query shape with the default boost.
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            boost: DEFAULT_BOOST,
        }
    }

    /// Formats the tree with indentation.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let boost = if self.boost == DEFAULT_BOOST {
            String::new()
        } else {
            format!("^{}", self.boost)
        };
        match &self.kind {
            QueryKind::All => writeln!(f, "{indent}All{boost}"),
            QueryKind::Boolean {
                must,
                should,
                must_not,
            } => {
                writeln!(f, "{indent}Boolean{boost}")?;
                for (label, group) in [("must", must), ("should", should), ("must_not", must_not)] {
                    if group.is_empty() {
                        continue;
                    }
                    writeln!(f, "{indent}  {label}:")?;
                    for child in group {
                        child.fmt_tree(f, depth + 2)?;
                    }
                }
                Ok(())
            }
            QueryKind::Term { field, term } => writeln!(f, "{indent}Term({field}:{term:?}){boost}"),
            QueryKind::Range {
                field,
                lower,
                upper,
            } => {
                let lower = match lower {
                    Bound::Included(v) => format!("[{v}"),
                    Bound::Excluded(v) => format!("({v}"),
                    Bound::Unbounded => "(*".to_string(),
                };
                let upper = match upper {
                    Bound::Included(v) => format!("{v}]"),
                    Bound::Excluded(v) => format!("{v})"),
                    Bound::Unbounded => "*)".to_string(),
                };
                writeln!(f, "{indent}Range({field} in {lower}, {upper}){boost}")
            }
            QueryKind::Phrase { field, terms, slop } => {
                writeln!(f, "{indent}Phrase({field}:{terms:?}~{slop}){boost}")
            }
            QueryKind::Prefix { field, value } => {
                writeln!(f, "{indent}Prefix({field}:{value:?}){boost}")
            }
            QueryKind::Wildcard { field, value } => {
                writeln!(f, "{indent}Wildcard({field}:{value:?}){boost}")
            }
            QueryKind::Regexp { field, value } => {
                writeln!(f, "{indent}Regexp({field}:{value:?}){boost}")
            }
            QueryKind::Fuzzy {
                field,
                value,
                max_edits,
                ..
            } => writeln!(f, "{indent}Fuzzy({field}:{value:?}~{max_edits}){boost}"),
            QueryKind::Raw {
                default_fields,
                syntax,
            } => writeln!(f, "{indent}Raw({syntax:?} over {default_fields:?}){boost}"),
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Compiles conditions against a schema.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    /// Schema used to resolve fields.
    schema: &'a Schema,
}

impl<'a> QueryCompiler<'a> {
    /// Creates a compiler for `schema`.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Compiles a condition tree.
    pub fn compile(&self, condition: &Condition) -> Result<CompiledQuery, IndexError> {
        let kind = match condition {
            Condition::All { .. } => QueryKind::All,
            Condition::Boolean {
                must,
                should,
                must_not,
                ..
            } => QueryKind::Boolean {
                must: self.compile_all(must)?,
                should: self.compile_all(should)?,
                must_not: self.compile_all(must_not)?,
            },
            Condition::Match { field, value, .. } => self.compile_match(field, value)?,
            Condition::Contains { field, values, .. } => {
                let should = values
                    .iter()
                    .map(|value| self.compile_match(field, value).map(CompiledQuery::new))
                    .collect::<Result<_, _>>()?;
                QueryKind::Boolean {
                    must: Vec::new(),
                    should,
                    must_not: Vec::new(),
                }
            }
            Condition::Range {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
                ..
            } => {
                let mapped = self.target(field, "range")?;
                if matches!(mapped.mapper.encoder(), FieldEncoder::GeoShape(_)) {
                    return Err(IndexError::unsupported(field, "geo_shape", "range"));
                }
                QueryKind::Range {
                    field: field.clone(),
                    lower: self.range_bound(mapped, field, lower.as_ref(), *include_lower)?,
                    upper: self.range_bound(mapped, field, upper.as_ref(), *include_upper)?,
                }
            }
            Condition::Phrase {
                field,
                values,
                slop,
                ..
            } => self.compile_phrase(field, values, *slop)?,
            Condition::Prefix { field, value, .. } => {
                let (field, value) = self.pattern_target(field, value, "prefix")?;
                QueryKind::Prefix { field, value }
            }
            Condition::Wildcard { field, value, .. } => {
                let (field, value) = self.pattern_target(field, value, "wildcard")?;
                QueryKind::Wildcard { field, value }
            }
            Condition::Regexp { field, value, .. } => {
                let (field, value) = self.pattern_target(field, value, "regexp")?;
                QueryKind::Regexp { field, value }
            }
            Condition::Fuzzy {
                field,
                value,
                max_edits,
                prefix_length,
                max_expansions,
                transpositions,
                ..
            } => {
                let mapped = self.term_target(field, "fuzzy")?;
                if *max_edits > 2 {
                    return Err(IndexError::invalid_value(
                        field,
                        mapped.mapper.type_name(),
                        max_edits,
                        "max_edits must be between 0 and 2",
                    ));
                }
                QueryKind::Fuzzy {
                    field: field.clone(),
                    value: fold_case(mapped, value),
                    max_edits: *max_edits,
                    prefix_length: *prefix_length,
                    max_expansions: *max_expansions,
                    transpositions: *transpositions,
                }
            }
            Condition::RawQuery {
                default_field,
                syntax,
                ..
            } => {
                let default_fields = match default_field {
                    Some(field) => {
                        let path = self.schema.path(field)?;
                        if path.key.is_some() {
                            return Err(IndexError::unsupported(
                                field,
                                path.mapped.mapper.type_name(),
                                "raw",
                            ));
                        }
                        vec![self.target(field, "raw")?.name.clone()]
                    }
                    None => self
                        .schema
                        .fields()
                        .filter(|f| f.mapper.is_text() && f.mapper.indexed())
                        .map(|f| f.name.clone())
                        .collect(),
                };
                QueryKind::Raw {
                    default_fields,
                    syntax: syntax.clone(),
                }
            }
        };
        trace!(condition = condition.type_name(), "compiled condition");
        Ok(CompiledQuery {
            kind,
            boost: condition.boost(),
        })
    }

    /// Compiles a group of child conditions.
    fn compile_all(&self, conditions: &[Condition]) -> Result<Vec<CompiledQuery>, IndexError> {
        conditions.iter().map(|c| self.compile(c)).collect()
    }

    /// Resolves an indexed field for an operation.
    fn target(&self, field: &str, operation: &'static str) -> Result<&'a MappedField, IndexError> {
        let mapped = self.schema.resolve(field)?;
        if !mapped.mapper.indexed() {
            return Err(IndexError::unsupported(
                field,
                mapped.mapper.type_name(),
                operation,
            ));
        }
        Ok(mapped)
    }

    /// Resolves a field whose mapper is string or text.
    fn term_target(
        &self,
        field: &str,
        operation: &'static str,
    ) -> Result<&'a MappedField, IndexError> {
        let mapped = self.target(field, operation)?;
        match mapped.mapper.encoder() {
            FieldEncoder::String { .. } | FieldEncoder::Text { .. } => Ok(mapped),
            _ => Err(IndexError::unsupported(
                field,
                mapped.mapper.type_name(),
                operation,
            )),
        }
    }

    /// Resolves a pattern operation's field and raw value.
    fn pattern_target(
        &self,
        field: &str,
        value: &str,
        operation: &'static str,
    ) -> Result<(String, String), IndexError> {
        let mapped = self.target(field, operation)?;
        match mapped.mapper.encoder() {
            FieldEncoder::String { .. } | FieldEncoder::Text { .. } | FieldEncoder::Inet => {
                Ok((field.to_string(), fold_case(mapped, value)))
            }
            _ => Err(IndexError::unsupported(
                field,
                mapped.mapper.type_name(),
                operation,
            )),
        }
    }

    /// Compiles a match of one value.
    fn compile_match(&self, field: &str, value: &Value) -> Result<QueryKind, IndexError> {
        let mapped = self.target(field, "match")?;
        let name = field.to_string();
        let encoded = mapped.mapper.to_query_value(field, value)?.ok_or_else(|| {
            IndexError::invalid_value(field, mapped.mapper.type_name(), value, "value is null")
        })?;

        Ok(match encoded {
            IndexValue::Terms(terms) => QueryKind::Boolean {
                must: Vec::new(),
                should: terms
                    .into_iter()
                    .map(|term| {
                        CompiledQuery::new(QueryKind::Term {
                            field: name.clone(),
                            term,
                        })
                    })
                    .collect(),
                must_not: Vec::new(),
            },
            IndexValue::String(text) if mapped.mapper.is_text() => QueryKind::Term {
                term: self.single_token(mapped, field, &text)?,
                field: name,
            },
            IndexValue::String(term) => QueryKind::Term { field: name, term },
            number => QueryKind::Range {
                field: name,
                lower: Bound::Included(number.clone()),
                upper: Bound::Included(number),
            },
        })
    }

    /// Encodes one range bound. Absent and null bounds are open.
    fn range_bound(
        &self,
        mapped: &MappedField,
        field: &str,
        value: Option<&Value>,
        inclusive: bool,
    ) -> Result<Bound<IndexValue>, IndexError> {
        let Some(value) = value else {
            return Ok(Bound::Unbounded);
        };
        let encoded = match mapped.mapper.to_query_value(field, value)? {
            None => return Ok(Bound::Unbounded),
            Some(IndexValue::String(text)) if mapped.mapper.is_text() => {
                IndexValue::String(self.single_token(mapped, field, &text)?)
            }
            Some(encoded) => encoded,
        };
        Ok(if inclusive {
            Bound::Included(encoded)
        } else {
            Bound::Excluded(encoded)
        })
    }

    /// Compiles a phrase from its values.
    fn compile_phrase(
        &self,
        field: &str,
        values: &[String],
        slop: u32,
    ) -> Result<QueryKind, IndexError> {
        let mapped = self.term_target(field, "phrase")?;
        let mut terms = Vec::new();
        for value in values {
            match mapped.mapper.analyzer_id() {
                Some(analyzer) => terms.extend(self.schema.analyzers().tokenize(analyzer, value)?),
                None => terms.push(fold_case(mapped, value)),
            }
        }
        if terms.is_empty() {
            return Err(IndexError::invalid_value(
                field,
                mapped.mapper.type_name(),
                values.join(" "),
                "phrase has no terms",
            ));
        }
        Ok(QueryKind::Phrase {
            field: field.to_string(),
            terms,
            slop,
        })
    }

    /// Analyzes text that must yield exactly one token.
    fn single_token(
        &self,
        mapped: &MappedField,
        field: &str,
        text: &str,
    ) -> Result<String, IndexError> {
        let analyzer = mapped
            .mapper
            .analyzer_id()
            .unwrap_or(self.schema.default_analyzer());
        let mut tokens = self.schema.analyzers().tokenize(analyzer, text)?;
        match tokens.len() {
            1 => Ok(tokens.remove(0)),
            n => Err(IndexError::invalid_value(
                field,
                mapped.mapper.type_name(),
                text,
                format!("analyzed to {n} tokens, expected exactly one"),
            )),
        }
    }
}

/// Lower-cases raw values for case-insensitive string mappers.
fn fold_case(mapped: &MappedField, value: &str) -> String {
    match mapped.mapper.encoder() {
        FieldEncoder::String {
            case_sensitive: false,
        } => value.to_lowercase(),
        _ => value.to_string(),
    }
}
