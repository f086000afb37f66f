//! Error types for the celldex-data crate.

use thiserror::Error;

use crate::TypeTag;

/// Errors raised while decoding storage values or extracting cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// A physical column has no matching column definition.
    #[error("no column definition for physical column '{column}'")]
    SchemaMismatch {
        /// Name of the physical column.
        column: String,
    },

    /// Bytes could not be decoded as the declared type.
    #[error("cannot decode {type_tag} value: {reason}")]
    Decode {
        /// Declared storage type.
        type_tag: TypeTag,
        /// Why decoding failed.
        reason: String,
    },

    /// A value does not fit the storage type it is being serialized as.
    #[error("cannot serialize value as {type_tag}: {reason}")]
    Serialize {
        /// Target storage type.
        type_tag: TypeTag,
        /// Why serialization failed.
        reason: String,
    },

    /// A composite name or key is malformed.
    #[error("malformed composite value: {0}")]
    Composite(String),

    /// A textual literal could not be read as a storage type.
    #[error("invalid {type_tag} literal '{text}': {reason}")]
    Literal {
        /// Target storage type.
        type_tag: TypeTag,
        /// The literal as written.
        text: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A storage type string could not be parsed.
    #[error("invalid storage type '{0}'")]
    InvalidType(String),
}

impl DataError {
    /// Creates a `Decode` error.
    pub(crate) fn decode(type_tag: &TypeTag, reason: impl Into<String>) -> Self {
        Self::Decode {
            type_tag: type_tag.clone(),
            reason: reason.into(),
        }
    }

    /// Creates a `Serialize` error.
    pub(crate) fn serialize(type_tag: &TypeTag, reason: impl Into<String>) -> Self {
        Self::Serialize {
            type_tag: type_tag.clone(),
            reason: reason.into(),
        }
    }
}
