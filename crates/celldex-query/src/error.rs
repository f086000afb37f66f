//! Error types for condition and search documents.

use thiserror::Error;

use crate::CONDITION_TYPES;

/// Errors raised while reading condition or search documents.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The document is not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A condition names a type tag that is not registered.
    #[error("unknown condition type '{tag}'")]
    UnknownType {
        /// The offending tag.
        tag: String,
    },

    /// The document is well-formed JSON but not a valid condition or search.
    #[error("invalid {context}: {message}")]
    Configuration {
        /// What was being read, e.g. `match condition`.
        context: String,
        /// What is wrong with it.
        message: String,
    },
}

impl QueryError {
    /// Creates a configuration error.
    pub fn configuration(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Configuration {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Returns a suggestion for common errors.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnknownType { .. } => Some(format!(
                "Valid condition types are: {}",
                CONDITION_TYPES.join(", ")
            )),
            Self::Configuration { message, .. } if message.contains("unknown field") => {
                Some("Check the field names accepted by this condition type".to_string())
            }
            _ => None,
        }
    }
}
