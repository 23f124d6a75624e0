//! Turn the bytes of one archive message into a [`DecodedField`].

use std::path::Path;

use bytes::Bytes;
use radar_common::{DecodedField, GridShape};
use tracing::debug;

use crate::coords::coordinate_grids;
use crate::message::Grib2Message;
use crate::Grib2Error;

/// Reflectivity at or below this many dBZ is treated as no echo.
pub const DEFAULT_MASK_THRESHOLD: f32 = 5.0;

/// Decodes single-message payloads fetched by byte range.
#[derive(Debug, Clone)]
pub struct FieldDecoder {
    mask_threshold: Option<f32>,
    expected_parameter: Option<String>,
}

impl Default for FieldDecoder {
    fn default() -> Self {
        Self {
            mask_threshold: Some(DEFAULT_MASK_THRESHOLD),
            expected_parameter: None,
        }
    }
}

impl FieldDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values at or below `threshold` become missing. `None` disables masking.
    pub fn with_mask_threshold(mut self, threshold: Option<f32>) -> Self {
        self.mask_threshold = threshold;
        self
    }

    /// Fail unless the message carries this parameter (e.g. `REFC`).
    pub fn expecting_parameter(mut self, short_name: impl Into<String>) -> Self {
        self.expected_parameter = Some(short_name.into());
        self
    }

    pub fn mask_threshold(&self) -> Option<f32> {
        self.mask_threshold
    }

    /// Decode the message at the start of `data`.
    pub fn decode(&self, data: Bytes) -> Result<DecodedField, Grib2Error> {
        let message = Grib2Message::parse(data)?;

        if let Some(expected) = &self.expected_parameter {
            if message.parameter() != expected {
                return Err(Grib2Error::ParameterMismatch {
                    expected: expected.clone(),
                    found: message.parameter().to_string(),
                });
            }
        }

        let values = message.unpack_data()?;
        let (longitudes, latitudes) = coordinate_grids(&message.grid)?;
        let (nx, ny) = message.grid_dims();

        let mut field = DecodedField::new(
            values,
            longitudes,
            latitudes,
            GridShape::new(nx, ny),
            message.valid_time()?,
            message.reference_time(),
        )?;

        if let Some(threshold) = self.mask_threshold {
            let masked = field.mask_at_or_below(threshold);
            debug!(
                parameter = message.parameter(),
                level = message.level(),
                masked,
                threshold,
                "Masked weak values"
            );
        }

        Ok(field)
    }

    /// Decode a staged payload file.
    pub fn decode_file(&self, path: &Path) -> Result<DecodedField, Grib2Error> {
        let data = std::fs::read(path)?;
        self.decode(Bytes::from(data))
    }
}
