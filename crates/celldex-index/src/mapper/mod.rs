//! Field mappers: typed encoders from cell values to index values.
//!
//! A [`Mapper`] pairs a [`FieldEncoder`] with the options every mapper
//! shares (`indexed`, `sorted`). Mappers are built from configuration
//! through an explicit tag table; the tags are a stable contract:
//!
//! | tag | base type | options |
//! |-----|-----------|---------|
//! | `string` | string | `case_sensitive` |
//! | `text` | string (analyzed) | `analyzer` |
//! | `boolean` | string | |
//! | `integer`, `long`, `float`, `double` | numeric | |
//! | `bigint` | string | `digits` |
//! | `bigdec` | string | `integer_digits`, `decimal_digits` |
//! | `date` | long | `pattern` |
//! | `uuid`, `inet`, `blob` | string | |
//! | `geo_shape` | string (cells) | `max_levels` |

mod bignum;
mod date;
mod geo;
mod numeric;
mod scalar;

pub use bignum::{BigDecimalEncoder, BigIntegerEncoder};
use celldex_config::RawMapper;
use celldex_data::{TypeTag, Value};
pub use date::DateEncoder;
pub use geo::{BoundingBox, GeoShapeEncoder, MAX_CELLS, Shape, geohash};
use serde_json::{Map, Value as Json};

use crate::{BaseType, IndexError, IndexValue, SortKey};

/// Mapper type tags accepted in configuration.
pub const MAPPER_TYPES: &[&str] = &[
    "bigdec",
    "bigint",
    "blob",
    "boolean",
    "date",
    "double",
    "float",
    "geo_shape",
    "inet",
    "integer",
    "long",
    "string",
    "text",
    "uuid",
];

/// Builds an encoder from its type-specific options.
type BuildFn = fn(&mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError>;

/// Tag table: mapper type tag to encoder constructor.
const BUILDERS: &[(&str, BuildFn)] = &[
    ("bigdec", build_bigdec),
    ("bigint", build_bigint),
    ("blob", |_| Ok(FieldEncoder::Blob)),
    ("boolean", |_| Ok(FieldEncoder::Boolean)),
    ("date", build_date),
    ("double", |_| Ok(FieldEncoder::Double)),
    ("float", |_| Ok(FieldEncoder::Float)),
    ("geo_shape", build_geo_shape),
    ("inet", |_| Ok(FieldEncoder::Inet)),
    ("integer", |_| Ok(FieldEncoder::Integer)),
    ("long", |_| Ok(FieldEncoder::Long)),
    ("string", build_string),
    ("text", build_text),
    ("uuid", |_| Ok(FieldEncoder::Uuid)),
];

/// The closed set of value encoders.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEncoder {
    /// Identity stringification.
    String {
        /// When false, values are lower-cased.
        case_sensitive: bool,
    },
    /// Stringification, tokenized by an analyzer.
    Text {
        /// Analyzer id.
        analyzer: String,
    },
    /// `"true"` / `"false"` terms.
    Boolean,
    /// 32-bit integers.
    Integer,
    /// 64-bit integers.
    Long,
    /// 32-bit floats.
    Float,
    /// 64-bit floats.
    Double,
    /// Order-preserving big integers.
    BigInteger(BigIntegerEncoder),
    /// Order-preserving big decimals.
    BigDecimal(BigDecimalEncoder),
    /// Epoch milliseconds.
    Date(DateEncoder),
    /// Canonical UUID text.
    Uuid,
    /// Normalized IP address text.
    Inet,
    /// Lower-case hex.
    Blob,
    /// Geohash cells covering a shape.
    GeoShape(GeoShapeEncoder),
}

/// A field encoder plus the options common to all mappers.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapper {
    /// Value encoder.
    encoder: FieldEncoder,
    /// Whether conditions may target the field.
    indexed: bool,
    /// Whether results may be sorted by the field.
    sorted: bool,
}

impl Mapper {
    /// Creates an indexed, sortable mapper.
    pub fn new(encoder: FieldEncoder) -> Self {
        Self {
            encoder,
            indexed: true,
            sorted: true,
        }
    }

    /// Sets whether conditions may target the field.
    #[must_use]
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Sets whether results may be sorted by the field.
    #[must_use]
    pub fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Builds a mapper from configuration.
    ///
    /// Text fields without an `analyzer` option get `default_analyzer`.
    pub fn from_raw(
        field: &str,
        raw: &RawMapper,
        default_analyzer: &str,
    ) -> Result<Self, IndexError> {
        let build = BUILDERS
            .iter()
            .find(|(tag, _)| *tag == raw.kind)
            .map(|(_, build)| *build)
            .ok_or_else(|| {
                IndexError::Configuration(format!(
                    "field '{field}': unknown mapper type '{}' (expected one of: {})",
                    raw.kind,
                    MAPPER_TYPES.join(", ")
                ))
            })?;

        let mut options = MapperOptions {
            field,
            options: raw.options.clone(),
            default_analyzer,
        };
        let indexed = options.take_bool("indexed", true)?;
        let sorted = options.take_bool("sorted", true)?;
        let encoder = build(&mut options)?;
        options.finish()?;

        Ok(Self {
            encoder,
            indexed,
            sorted,
        })
    }

    /// The value encoder.
    pub fn encoder(&self) -> &FieldEncoder {
        &self.encoder
    }

    /// Whether conditions may target the field.
    pub fn indexed(&self) -> bool {
        self.indexed
    }

    /// Whether results may be sorted by the field.
    pub fn sorted(&self) -> bool {
        self.sorted
    }

    /// The mapper's configuration tag.
    pub fn type_name(&self) -> &'static str {
        match &self.encoder {
            FieldEncoder::String { .. } => "string",
            FieldEncoder::Text { .. } => "text",
            FieldEncoder::Boolean => "boolean",
            FieldEncoder::Integer => "integer",
            FieldEncoder::Long => "long",
            FieldEncoder::Float => "float",
            FieldEncoder::Double => "double",
            FieldEncoder::BigInteger(_) => "bigint",
            FieldEncoder::BigDecimal(_) => "bigdec",
            FieldEncoder::Date(_) => "date",
            FieldEncoder::Uuid => "uuid",
            FieldEncoder::Inet => "inet",
            FieldEncoder::Blob => "blob",
            FieldEncoder::GeoShape(_) => "geo_shape",
        }
    }

    /// Primitive type values are stored as.
    pub fn base_type(&self) -> BaseType {
        match &self.encoder {
            FieldEncoder::Integer => BaseType::Integer,
            FieldEncoder::Long | FieldEncoder::Date(_) => BaseType::Long,
            FieldEncoder::Float => BaseType::Float,
            FieldEncoder::Double => BaseType::Double,
            _ => BaseType::String,
        }
    }

    /// Analyzer id for text mappers.
    pub fn analyzer_id(&self) -> Option<&str> {
        match &self.encoder {
            FieldEncoder::Text { analyzer } => Some(analyzer),
            _ => None,
        }
    }

    /// Returns true for mappers whose values are tokenized.
    pub fn is_text(&self) -> bool {
        matches!(self.encoder, FieldEncoder::Text { .. })
    }

    /// Storage types whose values this mapper accepts.
    pub fn supported_types(&self) -> Vec<TypeTag> {
        let mut types = vec![TypeTag::Ascii, TypeTag::Text, TypeTag::Varchar];
        let numbers = [
            TypeTag::Int,
            TypeTag::BigInt,
            TypeTag::Counter,
            TypeTag::Varint,
        ];
        match &self.encoder {
            FieldEncoder::String { .. } => {
                types.extend(numbers);
                types.extend([
                    TypeTag::Decimal,
                    TypeTag::Float,
                    TypeTag::Double,
                    TypeTag::Boolean,
                    TypeTag::Timestamp,
                    TypeTag::Uuid,
                    TypeTag::TimeUuid,
                    TypeTag::Inet,
                    TypeTag::Blob,
                ]);
            }
            FieldEncoder::Text { .. } | FieldEncoder::GeoShape(_) => {}
            FieldEncoder::Boolean => types.push(TypeTag::Boolean),
            FieldEncoder::Integer
            | FieldEncoder::Long
            | FieldEncoder::Float
            | FieldEncoder::Double => {
                types.extend(numbers);
                types.extend([
                    TypeTag::Decimal,
                    TypeTag::Float,
                    TypeTag::Double,
                    TypeTag::Timestamp,
                ]);
            }
            FieldEncoder::BigInteger(_) => types.extend(numbers),
            FieldEncoder::BigDecimal(_) => {
                types.extend(numbers);
                types.extend([TypeTag::Decimal, TypeTag::Float, TypeTag::Double]);
            }
            FieldEncoder::Date(_) => types.extend([
                TypeTag::Int,
                TypeTag::BigInt,
                TypeTag::Timestamp,
                TypeTag::TimeUuid,
            ]),
            FieldEncoder::Uuid => types.extend([TypeTag::Uuid, TypeTag::TimeUuid]),
            FieldEncoder::Inet => types.push(TypeTag::Inet),
            FieldEncoder::Blob => types.push(TypeTag::Blob),
        }
        types
    }

    /// Returns true if values of storage type `tag` are accepted.
    pub fn supports_type(&self, tag: &TypeTag) -> bool {
        self.supported_types().contains(tag)
    }

    /// Whether the mapper may target a clustering key column.
    pub fn supports_clustering(&self) -> bool {
        !matches!(
            self.encoder,
            FieldEncoder::Text { .. } | FieldEncoder::GeoShape(_)
        )
    }

    /// Encodes a cell value for indexing. Null values produce no field.
    pub fn to_index_value(
        &self,
        field: &str,
        value: &Value,
    ) -> Result<Option<IndexValue>, IndexError> {
        if value.is_null() {
            return Ok(None);
        }
        match &self.encoder {
            FieldEncoder::GeoShape(encoder) => {
                Ok(Some(IndexValue::Terms(encoder.index_terms(field, value)?)))
            }
            _ => self.encode(field, value).map(Some),
        }
    }

    /// Encodes a condition value for querying. Null values produce none.
    pub fn to_query_value(
        &self,
        field: &str,
        value: &Value,
    ) -> Result<Option<IndexValue>, IndexError> {
        if value.is_null() {
            return Ok(None);
        }
        match &self.encoder {
            FieldEncoder::GeoShape(encoder) => {
                Ok(Some(IndexValue::Terms(encoder.query_terms(field, value)?)))
            }
            _ => self.encode(field, value).map(Some),
        }
    }

    /// Builds the sort key for this field.
    pub fn sort_key(&self, field: &str, reverse: bool) -> Result<SortKey, IndexError> {
        let sortable = self.sorted
            && !matches!(
                self.encoder,
                FieldEncoder::Text { .. } | FieldEncoder::GeoShape(_)
            );
        if !sortable {
            return Err(IndexError::unsupported(field, self.type_name(), "sort"));
        }
        Ok(SortKey {
            field: field.to_string(),
            base_type: self.base_type(),
            reverse,
        })
    }

    /// Encodes a non-null scalar value.
    fn encode(&self, field: &str, value: &Value) -> Result<IndexValue, IndexError> {
        let invalid = |reason: String| IndexError::invalid_value(field, self.type_name(), value, reason);
        Ok(match &self.encoder {
            FieldEncoder::String { case_sensitive } => {
                let s = scalar::stringify(value);
                IndexValue::String(if *case_sensitive { s } else { s.to_lowercase() })
            }
            FieldEncoder::Text { .. } => IndexValue::String(scalar::stringify(value)),
            FieldEncoder::Boolean => {
                IndexValue::String(scalar::boolean(value).map_err(invalid)?.to_string())
            }
            FieldEncoder::Integer => IndexValue::Integer(numeric::coerce(value).map_err(invalid)?),
            FieldEncoder::Long => IndexValue::Long(numeric::coerce(value).map_err(invalid)?),
            FieldEncoder::Float => IndexValue::Float(numeric::coerce(value).map_err(invalid)?),
            FieldEncoder::Double => IndexValue::Double(numeric::coerce(value).map_err(invalid)?),
            FieldEncoder::BigInteger(encoder) => IndexValue::String(encoder.encode(field, value)?),
            FieldEncoder::BigDecimal(encoder) => IndexValue::String(encoder.encode(field, value)?),
            FieldEncoder::Date(encoder) => IndexValue::Long(encoder.encode(field, value)?),
            FieldEncoder::Uuid => IndexValue::String(scalar::uuid(value).map_err(invalid)?),
            FieldEncoder::Inet => IndexValue::String(scalar::inet(value).map_err(invalid)?),
            FieldEncoder::Blob => IndexValue::String(scalar::blob(value).map_err(invalid)?),
            FieldEncoder::GeoShape(encoder) => {
                IndexValue::Terms(encoder.index_terms(field, value)?)
            }
        })
    }
}

/// Options of one mapper, consumed as they are read.
struct MapperOptions<'a> {
    /// Field being configured.
    field: &'a str,
    /// Options not yet read.
    options: Map<String, Json>,
    /// Schema default analyzer.
    default_analyzer: &'a str,
}

impl MapperOptions<'_> {
    /// Error for an option of the wrong type.
    fn wrong_type(&self, key: &str, expected: &str) -> IndexError {
        IndexError::Configuration(format!(
            "field '{}': option '{key}' must be {expected}",
            self.field
        ))
    }

    /// Takes a boolean option.
    fn take_bool(&mut self, key: &str, default: bool) -> Result<bool, IndexError> {
        match self.options.remove(key) {
            None => Ok(default),
            Some(Json::Bool(b)) => Ok(b),
            Some(_) => Err(self.wrong_type(key, "a boolean")),
        }
    }

    /// Takes a non-negative integer option.
    fn take_u32(&mut self, key: &str, default: u32) -> Result<u32, IndexError> {
        match self.options.remove(key) {
            None => Ok(default),
            Some(json) => json
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| self.wrong_type(key, "a non-negative integer")),
        }
    }

    /// Takes a string option.
    fn take_string(&mut self, key: &str) -> Result<Option<String>, IndexError> {
        match self.options.remove(key) {
            None => Ok(None),
            Some(Json::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.wrong_type(key, "a string")),
        }
    }

    /// Fails if any option was not consumed.
    fn finish(self) -> Result<(), IndexError> {
        match self.options.keys().next() {
            None => Ok(()),
            Some(key) => Err(IndexError::Configuration(format!(
                "field '{}': unknown option '{key}'",
                self.field
            ))),
        }
    }
}

/// Builds a `string` encoder.
fn build_string(options: &mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError> {
    Ok(FieldEncoder::String {
        case_sensitive: options.take_bool("case_sensitive", true)?,
    })
}

/// Builds a `text` encoder.
fn build_text(options: &mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError> {
    let analyzer = options
        .take_string("analyzer")?
        .unwrap_or_else(|| options.default_analyzer.to_string());
    Ok(FieldEncoder::Text { analyzer })
}

/// Builds a `bigint` encoder.
fn build_bigint(options: &mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError> {
    let digits = options.take_u32("digits", BigIntegerEncoder::DEFAULT_DIGITS)?;
    Ok(FieldEncoder::BigInteger(BigIntegerEncoder::new(digits)?))
}

/// Builds a `bigdec` encoder.
fn build_bigdec(options: &mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError> {
    let integer_digits =
        options.take_u32("integer_digits", BigDecimalEncoder::DEFAULT_INTEGER_DIGITS)?;
    let decimal_digits =
        options.take_u32("decimal_digits", BigDecimalEncoder::DEFAULT_DECIMAL_DIGITS)?;
    Ok(FieldEncoder::BigDecimal(BigDecimalEncoder::new(
        integer_digits,
        decimal_digits,
    )?))
}

/// Builds a `date` encoder.
fn build_date(options: &mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError> {
    let pattern = options.take_string("pattern")?;
    Ok(FieldEncoder::Date(DateEncoder::new(
        pattern.as_deref().unwrap_or(DateEncoder::DEFAULT_PATTERN),
    )?))
}

/// Builds a `geo_shape` encoder.
fn build_geo_shape(options: &mut MapperOptions<'_>) -> Result<FieldEncoder, IndexError> {
    let levels = options.take_u32("max_levels", u32::from(GeoShapeEncoder::DEFAULT_MAX_LEVELS))?;
    let levels = u8::try_from(levels).unwrap_or(u8::MAX);
    Ok(FieldEncoder::GeoShape(GeoShapeEncoder::new(levels)?))
}
