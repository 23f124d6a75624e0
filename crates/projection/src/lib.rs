//! Coordinate reference system transformations.
//!
//! Implements the grid projections needed to georeference model output.

pub mod lambert;

pub use lambert::{normalize_lon, LambertConformal, LambertParams, NCEP_EARTH_RADIUS};

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("Invalid projection parameters: {0}")]
    InvalidParameters(String),
}
