//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! Covers what a ranged fetch of one HRRR field needs: the `.idx` inventory
//! that locates the message, section parsing for lat/lon and Lambert
//! conformal grids, and unpacking into a georeferenced field.

pub mod coords;
pub mod decode;
pub mod idx;
pub mod message;
pub mod sections;
pub mod tables;
pub mod unpacking;

pub use decode::{FieldDecoder, DEFAULT_MASK_THRESHOLD};
pub use idx::{
    parse_index, resolve_range, ByteRange, FieldSelector, IdxError, IndexEntry, IndexResolver,
    InvalidRange,
};
pub use message::Grib2Message;
pub use sections::GridDefinition;

use radar_common::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Message truncated: needs {expected} bytes, have {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Unpacking failed: {0}")]
    UnpackingError(String),

    #[error("Expected parameter {expected}, message contains {found}")]
    ParameterMismatch { expected: String, found: String },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
