//! Geographical shapes indexed on a geohash prefix grid.
//!
//! A shape is approximated by its bounding box, which is covered by the
//! geohash cells of one level: the deepest level, up to `max_levels`, that
//! needs at most [`MAX_CELLS`] cells.
//!
//! Indexed terms are every prefix of each covering cell plus the covering
//! cell itself marked with a trailing `+`. A query shape matches when one of
//! its covering cells is a prefix of an indexed cell (the plain terms), or
//! when an indexed cell is a prefix of a query cell (the marked terms).

use std::{collections::BTreeSet, fmt, str::FromStr};

use celldex_data::Value;

use crate::IndexError;

/// Maximum number of cells used to cover one shape.
pub const MAX_CELLS: u64 = 64;

/// Geohash alphabet.
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Mean kilometres per degree of latitude.
const KM_PER_DEGREE: f64 = 111.195;

/// Marks a covering cell, as opposed to one of its prefixes.
const LEAF_MARK: char = '+';

/// A parsed shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A single position.
    Point {
        /// Longitude in degrees.
        lon: f64,
        /// Latitude in degrees.
        lat: f64,
    },
    /// A circle given by centre and radius.
    Circle {
        /// Centre longitude in degrees.
        lon: f64,
        /// Centre latitude in degrees.
        lat: f64,
        /// Radius in kilometres.
        radius_km: f64,
    },
    /// An axis-aligned rectangle.
    Rectangle(BoundingBox),
    /// A closed ring of `(lon, lat)` vertices.
    Polygon(Vec<(f64, f64)>),
}

/// Axis-aligned bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western bound.
    pub min_lon: f64,
    /// Southern bound.
    pub min_lat: f64,
    /// Eastern bound.
    pub max_lon: f64,
    /// Northern bound.
    pub max_lat: f64,
}

impl Shape {
    /// Bounds of the shape, clamped to valid coordinates.
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Self::Point { lon, lat } => BoundingBox {
                min_lon: *lon,
                min_lat: *lat,
                max_lon: *lon,
                max_lat: *lat,
            },
            Self::Circle {
                lon,
                lat,
                radius_km,
            } => {
                let dlat = radius_km / KM_PER_DEGREE;
                let cos = lat.to_radians().cos();
                let dlon = if cos > 1e-9 { dlat / cos } else { 360.0 };
                BoundingBox {
                    min_lon: (lon - dlon).max(-180.0),
                    min_lat: (lat - dlat).max(-90.0),
                    max_lon: (lon + dlon).min(180.0),
                    max_lat: (lat + dlat).min(90.0),
                }
            }
            Self::Rectangle(bbox) => *bbox,
            Self::Polygon(ring) => ring.iter().fold(
                BoundingBox {
                    min_lon: f64::INFINITY,
                    min_lat: f64::INFINITY,
                    max_lon: f64::NEG_INFINITY,
                    max_lat: f64::NEG_INFINITY,
                },
                |b, &(lon, lat)| BoundingBox {
                    min_lon: b.min_lon.min(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lon: b.max_lon.max(lon),
                    max_lat: b.max_lat.max(lat),
                },
            ),
        }
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let open = s.find('(').ok_or("expected '('")?;
        let body = s[open + 1..].strip_suffix(')').ok_or("expected ')'")?;
        let points = |body: &str| -> Result<Vec<(f64, f64)>, String> {
            body.split(',').map(parse_position).collect()
        };

        match s[..open].trim().to_ascii_uppercase().as_str() {
            "POINT" => {
                let (lon, lat) = parse_position(body)?;
                Ok(Self::Point { lon, lat })
            }
            "CIRCLE" => {
                let (centre, radius) = body.split_once(',').ok_or("expected centre, radius")?;
                let (lon, lat) = parse_position(centre)?;
                let radius_km: f64 = radius
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid radius '{}'", radius.trim()))?;
                if !(radius_km > 0.0 && radius_km.is_finite()) {
                    return Err("radius must be positive".into());
                }
                Ok(Self::Circle {
                    lon,
                    lat,
                    radius_km,
                })
            }
            "RECTANGLE" => match points(body)?.as_slice() {
                [(min_lon, min_lat), (max_lon, max_lat)] if min_lon <= max_lon && min_lat <= max_lat => {
                    Ok(Self::Rectangle(BoundingBox {
                        min_lon: *min_lon,
                        min_lat: *min_lat,
                        max_lon: *max_lon,
                        max_lat: *max_lat,
                    }))
                }
                _ => Err("expected min corner, max corner".into()),
            },
            "POLYGON" => {
                let ring = body
                    .trim()
                    .strip_prefix('(')
                    .and_then(|r| r.strip_suffix(')'))
                    .ok_or("expected ((...))")?;
                let ring = points(ring)?;
                if ring.len() < 3 {
                    return Err("polygon needs at least three vertices".into());
                }
                Ok(Self::Polygon(ring))
            }
            other => Err(format!("unknown shape '{other}'")),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point { lon, lat } => write!(f, "POINT({lon} {lat})"),
            Self::Circle {
                lon,
                lat,
                radius_km,
            } => write!(f, "CIRCLE({lon} {lat}, {radius_km})"),
            Self::Rectangle(b) => write!(
                f,
                "RECTANGLE({} {}, {} {})",
                b.min_lon, b.min_lat, b.max_lon, b.max_lat
            ),
            Self::Polygon(ring) => {
                let vertices: Vec<String> =
                    ring.iter().map(|(lon, lat)| format!("{lon} {lat}")).collect();
                write!(f, "POLYGON(({}))", vertices.join(", "))
            }
        }
    }
}

/// Parses `lon lat`, validating ranges.
fn parse_position(s: &str) -> Result<(f64, f64), String> {
    let mut parts = s.split_whitespace();
    let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected 'lon lat', got '{}'", s.trim()));
    };
    let lon: f64 = lon.parse().map_err(|_| format!("invalid longitude '{lon}'"))?;
    let lat: f64 = lat.parse().map_err(|_| format!("invalid latitude '{lat}'"))?;
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {lon} out of range"));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} out of range"));
    }
    Ok((lon, lat))
}

/// Bits of longitude and latitude in a cell of `level` characters.
fn grid_bits(level: u8) -> (u32, u32) {
    let bits = 5 * u32::from(level);
    (bits.div_ceil(2), bits / 2)
}

/// Grid index of `value` on an axis spanning `min..min + span` with
/// `2^bits` cells.
fn grid_index(value: f64, min: f64, span: f64, bits: u32) -> u64 {
    let cells = 1u64 << bits;
    let scaled = ((value - min) / span * cells as f64).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as u64).min(cells - 1)
    }
}

/// Interleaves grid indices into a geohash string.
fn cell_hash(ix: u64, iy: u64, level: u8) -> String {
    let (lon_bits, lat_bits) = grid_bits(level);
    let mut hash = String::with_capacity(usize::from(level));
    let mut chunk = 0usize;
    for k in 0..5 * u32::from(level) {
        let bit = if k % 2 == 0 {
            (ix >> (lon_bits - 1 - k / 2)) & 1
        } else {
            (iy >> (lat_bits - 1 - k / 2)) & 1
        };
        chunk = (chunk << 1) | bit as usize;
        if k % 5 == 4 {
            hash.push(char::from(BASE32[chunk]));
            chunk = 0;
        }
    }
    hash
}

/// Geohash of a position at `level` characters.
pub fn geohash(lon: f64, lat: f64, level: u8) -> String {
    let (lon_bits, lat_bits) = grid_bits(level);
    cell_hash(
        grid_index(lon, -180.0, 360.0, lon_bits),
        grid_index(lat, -90.0, 180.0, lat_bits),
        level,
    )
}

/// Encodes shapes as geohash cell terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoShapeEncoder {
    /// Deepest geohash level used.
    max_levels: u8,
}

impl GeoShapeEncoder {
    /// Default deepest level.
    pub const DEFAULT_MAX_LEVELS: u8 = 8;
    /// Upper limit for `max_levels`.
    pub const LEVEL_LIMIT: u8 = 12;

    /// Creates an encoder using levels `1..=max_levels`.
    pub fn new(max_levels: u8) -> Result<Self, IndexError> {
        if !(1..=Self::LEVEL_LIMIT).contains(&max_levels) {
            return Err(IndexError::Configuration(format!(
                "geo_shape 'max_levels' must be between 1 and {}",
                Self::LEVEL_LIMIT
            )));
        }
        Ok(Self { max_levels })
    }

    /// Deepest geohash level used.
    pub fn max_levels(&self) -> u8 {
        self.max_levels
    }

    /// Cells covering `bbox` at the deepest level needing at most
    /// [`MAX_CELLS`] cells.
    pub fn covering(&self, bbox: &BoundingBox) -> Vec<String> {
        for level in (1..=self.max_levels).rev() {
            let (lon_bits, lat_bits) = grid_bits(level);
            let x0 = grid_index(bbox.min_lon, -180.0, 360.0, lon_bits);
            let x1 = grid_index(bbox.max_lon, -180.0, 360.0, lon_bits);
            let y0 = grid_index(bbox.min_lat, -90.0, 180.0, lat_bits);
            let y1 = grid_index(bbox.max_lat, -90.0, 180.0, lat_bits);
            if (x1 - x0 + 1) * (y1 - y0 + 1) > MAX_CELLS && level > 1 {
                continue;
            }
            let mut cells = Vec::new();
            for ix in x0..=x1 {
                for iy in y0..=y1 {
                    cells.push(cell_hash(ix, iy, level));
                }
            }
            cells.sort();
            return cells;
        }
        Vec::new()
    }

    /// Terms indexed for a shape value.
    pub fn index_terms(&self, field: &str, value: &Value) -> Result<Vec<String>, IndexError> {
        let mut terms = BTreeSet::new();
        for cell in self.covering(&self.parse(field, value)?.bounding_box()) {
            for end in 1..=cell.len() {
                terms.insert(cell[..end].to_string());
            }
            terms.insert(format!("{cell}{LEAF_MARK}"));
        }
        Ok(terms.into_iter().collect())
    }

    /// Terms any of which an intersecting indexed shape carries.
    pub fn query_terms(&self, field: &str, value: &Value) -> Result<Vec<String>, IndexError> {
        let mut terms = BTreeSet::new();
        for cell in self.covering(&self.parse(field, value)?.bounding_box()) {
            for end in 1..=cell.len() {
                terms.insert(format!("{}{LEAF_MARK}", &cell[..end]));
            }
            terms.insert(cell);
        }
        Ok(terms.into_iter().collect())
    }

    /// Parses a shape value.
    fn parse(&self, field: &str, value: &Value) -> Result<Shape, IndexError> {
        match value {
            Value::Text(s) => {
                s.parse()
                    .map_err(|reason: String| IndexError::invalid_value(field, "geo_shape", s, reason))
            }
            other => Err(IndexError::invalid_value(
                field,
                "geo_shape",
                other,
                format!("{} is not a shape", other.kind()),
            )),
        }
    }
}
