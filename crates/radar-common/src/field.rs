//! Decoded, georeferenced scalar fields.

use chrono::{DateTime, Utc};

use crate::bbox::BoundingBox;

/// Missing-data marker used in decoded value grids.
pub const MISSING: f32 = f32::NAN;

/// Dimensions of a row-major grid: `nx` columns by `ny` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub nx: usize,
    pub ny: usize,
}

impl GridShape {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { nx, ny }
    }

    /// Number of points in the grid.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One decoded archive message: values plus matching coordinate grids.
///
/// The three grids always share `shape`; construction fails otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    values: Vec<f32>,
    longitudes: Vec<f64>,
    latitudes: Vec<f64>,
    shape: GridShape,
    pub valid_time: DateTime<Utc>,
    pub analysis_time: DateTime<Utc>,
}

impl DecodedField {
    pub fn new(
        values: Vec<f32>,
        longitudes: Vec<f64>,
        latitudes: Vec<f64>,
        shape: GridShape,
        valid_time: DateTime<Utc>,
        analysis_time: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        let expected = shape.len();
        for (grid, len) in [
            ("values", values.len()),
            ("longitudes", longitudes.len()),
            ("latitudes", latitudes.len()),
        ] {
            if len != expected {
                return Err(FieldError::ShapeMismatch {
                    grid,
                    expected,
                    actual: len,
                    shape,
                });
            }
        }

        Ok(Self {
            values,
            longitudes,
            latitudes,
            shape,
            valid_time,
            analysis_time,
        })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Replace every value at or below `threshold` with [`MISSING`].
    ///
    /// Returns the number of points masked.
    pub fn mask_at_or_below(&mut self, threshold: f32) -> usize {
        let mut masked = 0;
        for v in self.values.iter_mut() {
            if *v <= threshold {
                *v = MISSING;
                masked += 1;
            }
        }
        masked
    }

    /// Count of non-missing values.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Geographic extent covered by the coordinate grids.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(
            self.longitudes
                .iter()
                .copied()
                .zip(self.latitudes.iter().copied()),
        )
    }

    /// Iterate `(lon, lat, value)` triples in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f32)> + '_ {
        self.longitudes
            .iter()
            .zip(self.latitudes.iter())
            .zip(self.values.iter())
            .map(|((&lon, &lat), &v)| (lon, lat, v))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("{grid} grid has {actual} points, expected {expected} for {}x{}", shape.nx, shape.ny)]
    ShapeMismatch {
        grid: &'static str,
        expected: usize,
        actual: usize,
        shape: GridShape,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn field(values: Vec<f32>) -> DecodedField {
        let n = values.len();
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        DecodedField::new(
            values,
            (0..n).map(|i| -100.0 + i as f64).collect(),
            vec![35.0; n],
            GridShape::new(n, 1),
            t,
            t,
        )
        .unwrap()
    }

    #[test]
    fn test_mask_threshold_is_inclusive() {
        let mut f = field(vec![-10.0, 0.0, 5.0, 5.0001, 42.0]);
        let masked = f.mask_at_or_below(5.0);

        assert_eq!(masked, 3);
        assert!(f.values()[0].is_nan());
        assert!(f.values()[1].is_nan());
        assert!(f.values()[2].is_nan());
        assert_eq!(f.values()[3], 5.0001);
        assert_eq!(f.values()[4], 42.0);
        assert_eq!(f.valid_count(), 2);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let t = Utc::now();
        let err = DecodedField::new(
            vec![1.0; 6],
            vec![0.0; 6],
            vec![0.0; 5],
            GridShape::new(3, 2),
            t,
            t,
        )
        .unwrap_err();

        match err {
            FieldError::ShapeMismatch {
                grid,
                expected,
                actual,
                ..
            } => {
                assert_eq!(grid, "latitudes");
                assert_eq!(expected, 6);
                assert_eq!(actual, 5);
            }
        }
    }
}
