//! Common types shared by the reflectivity loop crates.

pub mod bbox;
pub mod field;
pub mod time;

pub use bbox::{BoundingBox, ExtentError, GeoPoint};
pub use field::{DecodedField, FieldError, GridShape, MISSING};
pub use time::{parse_utc, ForecastTarget, TimeParseError};
