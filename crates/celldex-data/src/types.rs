//! Storage type tags.
//!
//! A [`TypeTag`] names the native type of a storage column. Collection types
//! carry their element types. Tags parse from and render to the storage
//! engine's textual type syntax, e.g. `int`, `set<text>`, `map<text, int>`.

use std::{fmt, str::FromStr};

use crate::DataError;

/// Native type of a storage column or value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// US-ASCII text.
    Ascii,
    /// UTF-8 text.
    Text,
    /// UTF-8 text (alias spelling kept distinct for validation messages).
    Varchar,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit counter.
    Counter,
    /// Arbitrary-precision integer.
    Varint,
    /// Arbitrary-precision decimal.
    Decimal,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// Boolean.
    Boolean,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// Any UUID.
    Uuid,
    /// Version 1 (time-based) UUID.
    TimeUuid,
    /// IPv4 or IPv6 address.
    Inet,
    /// Arbitrary bytes.
    Blob,
    /// Set of elements.
    Set(Box<Self>),
    /// List of elements.
    List(Box<Self>),
    /// Map from keys to values.
    Map(Box<Self>, Box<Self>),
}

/// Collection shape of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// A set column.
    Set,
    /// A list column.
    List,
    /// A map column.
    Map,
}

impl TypeTag {
    /// Returns the collection shape of this type, if any.
    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            Self::Set(_) => Some(CollectionKind::Set),
            Self::List(_) => Some(CollectionKind::List),
            Self::Map(..) => Some(CollectionKind::Map),
            _ => None,
        }
    }

    /// Returns true for set, list and map types.
    pub fn is_collection(&self) -> bool {
        self.collection_kind().is_some()
    }

    /// Returns the type of the values stored in cells of this type.
    ///
    /// For sets and lists this is the element type, for maps the value type,
    /// and for scalars the type itself.
    pub fn value_type(&self) -> &Self {
        match self {
            Self::Set(elem) | Self::List(elem) => elem,
            Self::Map(_, value) => value,
            other => other,
        }
    }

    /// Returns true for the textual types.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Ascii | Self::Text | Self::Varchar)
    }

    /// Returns the bare name of a scalar type.
    fn scalar_name(&self) -> Option<&'static str> {
        Some(match self {
            Self::Ascii => "ascii",
            Self::Text => "text",
            Self::Varchar => "varchar",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Counter => "counter",
            Self::Varint => "varint",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
            Self::TimeUuid => "timeuuid",
            Self::Inet => "inet",
            Self::Blob => "blob",
            Self::Set(_) | Self::List(_) | Self::Map(..) => return None,
        })
    }

    /// Parses a scalar type name.
    fn parse_scalar(name: &str) -> Option<Self> {
        Some(match name {
            "ascii" => Self::Ascii,
            "text" => Self::Text,
            "varchar" => Self::Varchar,
            "int" => Self::Int,
            "bigint" => Self::BigInt,
            "counter" => Self::Counter,
            "varint" => Self::Varint,
            "decimal" => Self::Decimal,
            "float" => Self::Float,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "timestamp" => Self::Timestamp,
            "uuid" => Self::Uuid,
            "timeuuid" => Self::TimeUuid,
            "inet" => Self::Inet,
            "blob" => Self::Blob,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(elem) => write!(f, "set<{elem}>"),
            Self::List(elem) => write!(f, "list<{elem}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            scalar => f.write_str(scalar.scalar_name().unwrap_or_default()),
        }
    }
}

impl FromStr for TypeTag {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let invalid = || DataError::InvalidType(s.to_string());

        let Some(open) = normalized.find('<') else {
            return Self::parse_scalar(&normalized).ok_or_else(invalid);
        };
        let inner = normalized[open + 1..]
            .strip_suffix('>')
            .ok_or_else(invalid)?
            .trim();

        match normalized[..open].trim() {
            "set" => Ok(Self::Set(Box::new(Self::parse_scalar(inner).ok_or_else(invalid)?))),
            "list" => Ok(Self::List(Box::new(
                Self::parse_scalar(inner).ok_or_else(invalid)?,
            ))),
            "map" => {
                let (key, value) = inner.split_once(',').ok_or_else(invalid)?;
                let key = Self::parse_scalar(key.trim()).ok_or_else(invalid)?;
                let value = Self::parse_scalar(value.trim()).ok_or_else(invalid)?;
                Ok(Self::Map(Box::new(key), Box::new(value)))
            }
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars_case_insensitively() {
        assert_eq!("int".parse::<TypeTag>().unwrap(), TypeTag::Int);
        assert_eq!("TimeUUID".parse::<TypeTag>().unwrap(), TypeTag::TimeUuid);
        assert_eq!(" blob ".parse::<TypeTag>().unwrap(), TypeTag::Blob);
    }

    #[test]
    fn parses_collections() {
        assert_eq!(
            "set<text>".parse::<TypeTag>().unwrap(),
            TypeTag::Set(Box::new(TypeTag::Text))
        );
        assert_eq!(
            "list<int>".parse::<TypeTag>().unwrap(),
            TypeTag::List(Box::new(TypeTag::Int))
        );
        assert_eq!(
            "map<text, bigint>".parse::<TypeTag>().unwrap(),
            TypeTag::Map(Box::new(TypeTag::Text), Box::new(TypeTag::BigInt))
        );
    }

    #[test]
    fn rejects_unknown_and_nested() {
        assert!("tinyint".parse::<TypeTag>().is_err());
        assert!("set<set<int>>".parse::<TypeTag>().is_err());
        assert!("map<text>".parse::<TypeTag>().is_err());
        assert!("list<int".parse::<TypeTag>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in ["int", "set<text>", "list<double>", "map<ascii, uuid>"] {
            let tag: TypeTag = text.parse().unwrap();
            assert_eq!(tag.to_string(), text);
        }
    }

    #[test]
    fn value_type_unwraps_collections() {
        let map: TypeTag = "map<text, int>".parse().unwrap();
        assert_eq!(map.value_type(), &TypeTag::Int);
        assert_eq!(map.collection_kind(), Some(CollectionKind::Map));
        assert_eq!(TypeTag::Int.value_type(), &TypeTag::Int);
        assert!(!TypeTag::Int.is_collection());
    }
}
