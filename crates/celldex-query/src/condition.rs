//! Condition tree.
//!
//! A [`Condition`] is one node of a declarative query. Conditions are built
//! once, either from JSON or with the constructors below, and then compiled
//! against a schema. They carry no execution state.

use std::fmt;

use celldex_data::Value;

/// Boost applied when a condition does not declare one.
pub const DEFAULT_BOOST: f32 = 1.0;

/// Default maximum edit distance of a fuzzy condition.
pub const DEFAULT_MAX_EDITS: u8 = 2;

/// Default number of leading characters a fuzzy match must share exactly.
pub const DEFAULT_PREFIX_LENGTH: usize = 0;

/// Default cap on the terms a fuzzy condition may expand to.
pub const DEFAULT_MAX_EXPANSIONS: usize = 50;

/// One node of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every document.
    All {
        /// Score multiplier.
        boost: f32,
    },

    /// Combines child conditions.
    ///
    /// Empty groups impose no constraint. A condition with only `must_not`
    /// children matches every document not matched by any of them.
    Boolean {
        /// Children that must all match.
        must: Vec<Self>,
        /// Children of which at least one must match when `must` is empty.
        should: Vec<Self>,
        /// Children that must not match.
        must_not: Vec<Self>,
        /// Score multiplier.
        boost: f32,
    },

    /// Exact value match.
    Match {
        /// Field to match.
        field: String,
        /// Value to match, coerced by the field's mapper.
        value: Value,
        /// Score multiplier.
        boost: f32,
    },

    /// Matches any of several values.
    Contains {
        /// Field to match.
        field: String,
        /// Candidate values.
        values: Vec<Value>,
        /// Score multiplier.
        boost: f32,
    },

    /// Values between two optional bounds.
    Range {
        /// Field to compare.
        field: String,
        /// Lower bound, open when absent.
        lower: Option<Value>,
        /// Upper bound, open when absent.
        upper: Option<Value>,
        /// Whether the lower bound itself matches.
        include_lower: bool,
        /// Whether the upper bound itself matches.
        include_upper: bool,
        /// Score multiplier.
        boost: f32,
    },

    /// Ordered sequence of terms.
    Phrase {
        /// Field to match.
        field: String,
        /// Terms in order.
        values: Vec<String>,
        /// Maximum number of position moves allowed between terms.
        slop: u32,
        /// Score multiplier.
        boost: f32,
    },

    /// Terms starting with a prefix.
    Prefix {
        /// Field to match.
        field: String,
        /// Raw prefix, not analyzed.
        value: String,
        /// Score multiplier.
        boost: f32,
    },

    /// Terms matching a glob pattern with `*` and `?`.
    Wildcard {
        /// Field to match.
        field: String,
        /// Raw pattern, not analyzed.
        value: String,
        /// Score multiplier.
        boost: f32,
    },

    /// Terms matching a regular expression.
    Regexp {
        /// Field to match.
        field: String,
        /// Regular expression matched against whole terms.
        value: String,
        /// Score multiplier.
        boost: f32,
    },

    /// Terms within an edit distance of a value.
    Fuzzy {
        /// Field to match.
        field: String,
        /// Value to compare terms against.
        value: String,
        /// Maximum Levenshtein distance, `0..=2`.
        max_edits: u8,
        /// Leading characters that must match exactly.
        prefix_length: usize,
        /// Cap on the number of expanded terms.
        max_expansions: usize,
        /// Whether a transposition counts as a single edit.
        transpositions: bool,
        /// Score multiplier.
        boost: f32,
    },

    /// Query string handed to the search engine's own parser.
    RawQuery {
        /// Field searched by unqualified terms; all text fields when absent.
        default_field: Option<String>,
        /// Query string.
        syntax: String,
        /// Score multiplier.
        boost: f32,
    },
}

impl Condition {
    /// Creates a condition matching every document.
    pub fn all() -> Self {
        Self::All {
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates an empty boolean condition.
    pub fn boolean() -> Self {
        Self::Boolean {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates an exact match condition.
    pub fn matching(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Match {
            field: field.into(),
            value: value.into(),
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a range condition with exclusive bounds.
    pub fn range(field: impl Into<String>, lower: Option<Value>, upper: Option<Value>) -> Self {
        Self::Range {
            field: field.into(),
            lower,
            upper,
            include_lower: false,
            include_upper: false,
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a phrase condition without slop.
    pub fn phrase<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Phrase {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            slop: 0,
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a prefix condition.
    pub fn prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Prefix {
            field: field.into(),
            value: value.into(),
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a wildcard condition.
    pub fn wildcard(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Wildcard {
            field: field.into(),
            value: value.into(),
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a fuzzy condition with default options.
    pub fn fuzzy(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Fuzzy {
            field: field.into(),
            value: value.into(),
            max_edits: DEFAULT_MAX_EDITS,
            prefix_length: DEFAULT_PREFIX_LENGTH,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            transpositions: true,
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a raw query condition.
    pub fn raw(default_field: Option<String>, syntax: impl Into<String>) -> Self {
        Self::RawQuery {
            default_field,
            syntax: syntax.into(),
            boost: DEFAULT_BOOST,
        }
    }

    /// Adds a child that must match. No-op on non-boolean conditions.
    pub fn must(mut self, child: Self) -> Self {
        if let Self::Boolean { must, .. } = &mut self {
            must.push(child);
        }
        self
    }

    /// Adds a child that should match. No-op on non-boolean conditions.
    pub fn should(mut self, child: Self) -> Self {
        if let Self::Boolean { should, .. } = &mut self {
            should.push(child);
        }
        self
    }

    /// Adds a child that must not match. No-op on non-boolean conditions.
    pub fn must_not(mut self, child: Self) -> Self {
        if let Self::Boolean { must_not, .. } = &mut self {
            must_not.push(child);
        }
        self
    }

    /// Replaces the condition's boost.
    pub fn with_boost(mut self, factor: f32) -> Self {
        *self.boost_mut() = factor;
        self
    }

    /// Returns the condition's own boost.
    pub fn boost(&self) -> f32 {
        match self {
            Self::All { boost }
            | Self::Boolean { boost, .. }
            | Self::Match { boost, .. }
            | Self::Contains { boost, .. }
            | Self::Range { boost, .. }
            | Self::Phrase { boost, .. }
            | Self::Prefix { boost, .. }
            | Self::Wildcard { boost, .. }
            | Self::Regexp { boost, .. }
            | Self::Fuzzy { boost, .. }
            | Self::RawQuery { boost, .. } => *boost,
        }
    }

    /// Mutable access to the condition's boost.
    fn boost_mut(&mut self) -> &mut f32 {
        match self {
            Self::All { boost }
            | Self::Boolean { boost, .. }
            | Self::Match { boost, .. }
            | Self::Contains { boost, .. }
            | Self::Range { boost, .. }
            | Self::Phrase { boost, .. }
            | Self::Prefix { boost, .. }
            | Self::Wildcard { boost, .. }
            | Self::Regexp { boost, .. }
            | Self::Fuzzy { boost, .. }
            | Self::RawQuery { boost, .. } => boost,
        }
    }

    /// Returns the type tag naming this condition in JSON documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::All { .. } => "all",
            Self::Boolean { .. } => "boolean",
            Self::Match { .. } => "match",
            Self::Contains { .. } => "contains",
            Self::Range { .. } => "range",
            Self::Phrase { .. } => "phrase",
            Self::Prefix { .. } => "prefix",
            Self::Wildcard { .. } => "wildcard",
            Self::Regexp { .. } => "regexp",
            Self::Fuzzy { .. } => "fuzzy",
            Self::RawQuery { .. } => "raw",
        }
    }

    /// Returns the field this condition targets, if it targets exactly one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Match { field, .. }
            | Self::Contains { field, .. }
            | Self::Range { field, .. }
            | Self::Phrase { field, .. }
            | Self::Prefix { field, .. }
            | Self::Wildcard { field, .. }
            | Self::Regexp { field, .. }
            | Self::Fuzzy { field, .. } => Some(field),
            Self::RawQuery { default_field, .. } => default_field.as_deref(),
            Self::All { .. } | Self::Boolean { .. } => None,
        }
    }

    /// Formats the condition as a tree with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        let boost = BoostSuffix(self.boost());
        match self {
            Self::All { .. } => writeln!(f, "{prefix}All{boost}"),
            Self::Boolean {
                must,
                should,
                must_not,
                ..
            } => {
                writeln!(f, "{prefix}Boolean{boost}")?;
                for (label, group) in [("must", must), ("should", should), ("must_not", must_not)] {
                    if group.is_empty() {
                        continue;
                    }
                    writeln!(f, "{prefix}  {label}:")?;
                    for child in group {
                        child.fmt_tree(f, indent + 2)?;
                    }
                }
                Ok(())
            }
            Self::Match { field, value, .. } => {
                writeln!(f, "{prefix}Match({field} = {value:?}){boost}")
            }
            Self::Contains { field, values, .. } => {
                writeln!(f, "{prefix}Contains({field} in {values:?}){boost}")
            }
            Self::Range {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
                ..
            } => {
                let open = if *include_lower { '[' } else { '(' };
                let close = if *include_upper { ']' } else { ')' };
                let lower = lower.as_ref().map_or("*".to_string(), |v| format!("{v:?}"));
                let upper = upper.as_ref().map_or("*".to_string(), |v| format!("{v:?}"));
                writeln!(f, "{prefix}Range({field} in {open}{lower}, {upper}{close}){boost}")
            }
            Self::Phrase {
                field,
                values,
                slop,
                ..
            } => writeln!(f, "{prefix}Phrase({field} ~ {values:?}, slop {slop}){boost}"),
            Self::Prefix { field, value, .. } => {
                writeln!(f, "{prefix}Prefix({field} ^ {value:?}){boost}")
            }
            Self::Wildcard { field, value, .. } => {
                writeln!(f, "{prefix}Wildcard({field} ~ {value:?}){boost}")
            }
            Self::Regexp { field, value, .. } => {
                writeln!(f, "{prefix}Regexp({field} ~ /{value}/){boost}")
            }
            Self::Fuzzy {
                field,
                value,
                max_edits,
                prefix_length,
                ..
            } => writeln!(
                f,
                "{prefix}Fuzzy({field} ~ {value:?}, edits {max_edits}, prefix {prefix_length}){boost}"
            ),
            Self::RawQuery {
                default_field,
                syntax,
                ..
            } => match default_field {
                Some(field) => writeln!(f, "{prefix}Raw({field}: {syntax:?}){boost}"),
                None => writeln!(f, "{prefix}Raw({syntax:?}){boost}"),
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Renders `^boost` unless the boost is the default.
struct BoostSuffix(f32);

impl fmt::Display for BoostSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == DEFAULT_BOOST {
            Ok(())
        } else {
            write!(f, "^{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_builder_collects_children() {
        let cond = Condition::boolean()
            .must(Condition::matching("name", "ann"))
            .should(Condition::prefix("city", "par"))
            .must_not(Condition::matching("age", 3_i64));

        let Condition::Boolean {
            must,
            should,
            must_not,
            boost,
        } = cond
        else {
            panic!("expected boolean");
        };
        assert_eq!(must.len(), 1);
        assert_eq!(should.len(), 1);
        assert_eq!(must_not.len(), 1);
        assert_eq!(boost, DEFAULT_BOOST);
    }

    #[test]
    fn builders_ignore_children_on_leaves() {
        let leaf = Condition::matching("name", "ann").must(Condition::all());
        assert_eq!(leaf, Condition::matching("name", "ann"));
    }

    #[test]
    fn with_boost_sets_only_own_boost() {
        let cond = Condition::boolean()
            .must(Condition::matching("name", "ann").with_boost(2.0))
            .with_boost(0.5);
        assert_eq!(cond.boost(), 0.5);
        let Condition::Boolean { must, .. } = &cond else {
            panic!("expected boolean");
        };
        assert_eq!(must[0].boost(), 2.0);
    }

    #[test]
    fn fuzzy_defaults() {
        let Condition::Fuzzy {
            max_edits,
            prefix_length,
            max_expansions,
            transpositions,
            ..
        } = Condition::fuzzy("name", "ann")
        else {
            panic!("expected fuzzy");
        };
        assert_eq!(max_edits, 2);
        assert_eq!(prefix_length, 0);
        assert_eq!(max_expansions, 50);
        assert!(transpositions);
    }

    #[test]
    fn display_renders_tree() {
        let cond = Condition::boolean()
            .must(Condition::matching("name", "ann").with_boost(2.0))
            .must_not(Condition::range("age", Some(Value::Int(3)), None));
        let rendered = cond.to_string();
        assert_eq!(
            rendered,
            "Boolean\n  must:\n    Match(name = Text(\"ann\"))^2\n  must_not:\n    Range(age in (Int(3), *))\n"
        );
    }

    #[test]
    fn field_reports_target() {
        assert_eq!(Condition::prefix("city", "p").field(), Some("city"));
        assert_eq!(Condition::all().field(), None);
        assert_eq!(Condition::raw(None, "a AND b").field(), None);
    }
}
