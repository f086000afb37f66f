//! Configuration validation.
//!
//! Reports non-fatal issues in a schema file. Fatal problems such as unknown
//! mapper types surface when the index crate builds the schema.

use std::{collections::BTreeSet, fmt};

use crate::RawSchema;

/// A non-fatal warning about a schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The schema maps no fields, so nothing will be indexed.
    NoFieldsDefined,
    /// A custom analyzer is defined but no field or default uses it.
    UnusedAnalyzer {
        /// Analyzer id.
        analyzer: String,
    },
    /// A mapper option is set on a field whose mapper is not indexed.
    IgnoredOption {
        /// Field name.
        field: String,
        /// Option that has no effect.
        option: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFieldsDefined => write!(f, "no fields are defined in schema"),
            Self::UnusedAnalyzer { analyzer } => {
                write!(f, "analyzer '{analyzer}' is not used by any field")
            }
            Self::IgnoredOption { field, option } => {
                write!(
                    f,
                    "option '{option}' on field '{field}' has no effect because the field is not indexed"
                )
            }
        }
    }
}

impl RawSchema {
    /// Validates the schema and returns any warnings.
    ///
    /// This checks for:
    /// - Schemas without fields
    /// - Custom analyzers nothing refers to
    /// - Query-time options on fields that are not indexed
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.fields.is_empty() {
            warnings.push(ConfigWarning::NoFieldsDefined);
        }

        let mut used: BTreeSet<&str> = self
            .fields
            .values()
            .filter_map(|mapper| mapper.options.get("analyzer")?.as_str())
            .collect();
        used.extend(self.default_analyzer.as_deref());
        for id in self.analyzers.keys() {
            if !used.contains(id.as_str()) {
                warnings.push(ConfigWarning::UnusedAnalyzer {
                    analyzer: id.clone(),
                });
            }
        }

        for (field, mapper) in &self.fields {
            if mapper.options.get("indexed").and_then(|v| v.as_bool()) != Some(false) {
                continue;
            }
            for option in ["analyzer", "case_sensitive"] {
                if mapper.options.contains_key(option) {
                    warnings.push(ConfigWarning::IgnoredOption {
                        field: field.clone(),
                        option: option.to_string(),
                    });
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{ConfigFormat, parse_schema_str};

    fn schema(toml: &str) -> RawSchema {
        parse_schema_str(toml, ConfigFormat::Toml, Path::new("s.toml")).unwrap()
    }

    #[test]
    fn test_validate_empty_schema() {
        let warnings = schema("").validate();
        assert_eq!(warnings, vec![ConfigWarning::NoFieldsDefined]);
    }

    #[test]
    fn test_validate_unused_analyzer() {
        let warnings = schema(
            r#"
default_analyzer = "used_default"

[analyzers.used_default]
type = "standard"

[analyzers.used_by_field]
type = "whitespace"

[analyzers.orphan]
type = "keyword"

[fields.bio]
type = "text"
analyzer = "used_by_field"
"#,
        )
        .validate();
        assert_eq!(warnings, vec![ConfigWarning::UnusedAnalyzer {
            analyzer: "orphan".into()
        }]);
    }

    #[test]
    fn test_validate_ignored_option() {
        let warnings = schema(
            r#"
[fields.name]
type = "string"
indexed = false
case_sensitive = false
"#,
        )
        .validate();
        assert_eq!(warnings, vec![ConfigWarning::IgnoredOption {
            field: "name".into(),
            option: "case_sensitive".into(),
        }]);
    }

    #[test]
    fn test_warning_display() {
        let warning = ConfigWarning::UnusedAnalyzer {
            analyzer: "orphan".into(),
        };
        assert_eq!(warning.to_string(), "analyzer 'orphan' is not used by any field");
        assert_eq!(
            ConfigWarning::NoFieldsDefined.to_string(),
            "no fields are defined in schema"
        );
    }
}
