//! A single parsed GRIB2 message.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};

use crate::sections::{
    self, Bitmap, DataRepresentation, GridDefinition, Identification, Indicator,
    ProductDefinition, END_MARKER,
};
use crate::unpacking;
use crate::Grib2Error;

/// One GRIB2 message (first field only for multi-field messages).
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid: GridDefinition,
    pub product: ProductDefinition,
    pub representation: DataRepresentation,
    pub bitmap: Bitmap,
    data: Bytes,
    raw: Bytes,
}

impl Grib2Message {
    /// Parse the message at the start of `data`.
    ///
    /// Bytes after the end marker are ignored.
    pub fn parse(data: Bytes) -> Result<Self, Grib2Error> {
        let indicator = sections::parse_indicator(&data)?;

        let length = indicator.message_length;
        if (data.len() as u64) < length {
            return Err(Grib2Error::Truncated {
                expected: length,
                actual: data.len() as u64,
            });
        }
        let length = length as usize;
        if length < sections::INDICATOR_LEN + END_MARKER.len()
            || &data[length - 4..length] != END_MARKER
        {
            return Err(Grib2Error::InvalidFormat(
                "message does not end with 7777".to_string(),
            ));
        }

        let raw = data.slice(..length);
        let found = sections::split_sections(&raw)?;
        let section = |number: u8| {
            found
                .iter()
                .find(|(n, _)| *n == number)
                .map(|(_, bytes)| *bytes)
                .ok_or_else(|| Grib2Error::InvalidSection {
                    section: number,
                    reason: "section missing".to_string(),
                })
        };

        let identification = sections::parse_identification(section(1)?)?;
        let grid = sections::parse_grid_definition(section(3)?)?;
        let product = sections::parse_product_definition(section(4)?, indicator.discipline)?;
        let representation = sections::parse_data_representation(section(5)?)?;
        let bitmap = match found.iter().find(|(n, _)| *n == 6) {
            Some((_, sec)) => sections::parse_bitmap(sec)?,
            None => Bitmap::Absent,
        };

        let data_section = section(7)?;
        let offset = data_section.as_ptr() as usize - raw.as_ptr() as usize;
        let data = raw.slice(offset + 5..offset + data_section.len());

        Ok(Self {
            indicator,
            identification,
            grid,
            product,
            representation,
            bitmap,
            data,
            raw,
        })
    }

    /// Model reference (analysis) time.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.identification.reference_time
    }

    /// Valid time: reference time plus the forecast offset.
    pub fn valid_time(&self) -> Result<DateTime<Utc>, Grib2Error> {
        let amount = self.product.forecast_time as i64;
        let offset = match self.product.time_unit {
            0 => Duration::minutes(amount),
            1 => Duration::hours(amount),
            2 => Duration::days(amount),
            10 => Duration::hours(3 * amount),
            11 => Duration::hours(6 * amount),
            12 => Duration::hours(12 * amount),
            13 => Duration::seconds(amount),
            other => {
                return Err(Grib2Error::Unsupported(format!(
                    "forecast time unit {}",
                    other
                )))
            }
        };
        Ok(self.reference_time() + offset)
    }

    /// Parameter short name, e.g. `REFC`.
    pub fn parameter(&self) -> &str {
        &self.product.parameter_short_name
    }

    /// Level description, e.g. `entire atmosphere`.
    pub fn level(&self) -> &str {
        &self.product.level_description
    }

    /// Grid dimensions (columns, rows).
    pub fn grid_dims(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    /// Unpack the data values in scan order, [`radar_common::MISSING`] for gaps.
    pub fn unpack_data(&self) -> Result<Vec<f32>, Grib2Error> {
        let num_points = self.grid.num_points();

        let values = match self.representation.template {
            0 => {
                let bitmap = match &self.bitmap {
                    Bitmap::Present(bits) => Some(bits.as_slice()),
                    Bitmap::Absent => None,
                };
                unpacking::unpack_simple(&self.data, num_points, &self.representation, bitmap)?
            }
            _ => unpacking::unpack_with_grib_crate(&self.raw)?,
        };

        if values.len() != num_points {
            return Err(Grib2Error::UnpackingError(format!(
                "unpacked {} values for a {} point grid",
                values.len(),
                num_points
            )));
        }

        Ok(values)
    }

    /// Total encoded length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
