//! GRIB2 data unpacking algorithms.
//!
//! Simple packing (template 5.0) is decoded natively. Complex packing with
//! spatial differencing (5.3, used by HRRR), JPEG2000 and PNG are delegated
//! to the `grib` crate.

use std::io::Cursor;

use radar_common::MISSING;

use crate::sections::DataRepresentation;
use crate::Grib2Error;

/// Unpack simple packed GRIB2 data
///
/// Simple packing formula: value = (R + X * 2^E) / 10^D
///
/// `num_points` is the total number of grid points. When a bitmap is given,
/// only points whose bit is set consume a packed value; the others become
/// [`MISSING`].
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: usize,
    repr: &DataRepresentation,
    bitmap: Option<&[u8]>,
) -> Result<Vec<f32>, Grib2Error> {
    let bits_per_value = repr.bits_per_value as usize;
    if bits_per_value > 32 {
        return Err(Grib2Error::UnpackingError(format!(
            "Invalid number of bits: {}",
            bits_per_value
        )));
    }

    if let Some(bm) = bitmap {
        if bm.len() * 8 < num_points {
            return Err(Grib2Error::UnpackingError(format!(
                "bitmap covers {} points, grid has {}",
                bm.len() * 8,
                num_points
            )));
        }
    }

    let reference = repr.reference_value as f64;
    let binary_scale = 2f64.powi(repr.binary_scale_factor as i32);
    let decimal_scale = 10f64.powi(repr.decimal_scale_factor as i32);

    let present = |i: usize| match bitmap {
        Some(bm) => (bm[i / 8] >> (7 - (i % 8))) & 1 == 1,
        None => true,
    };

    let packed_count = (0..num_points).filter(|&i| present(i)).count();
    let needed_bits = packed_count * bits_per_value;
    if packed_data.len() * 8 < needed_bits {
        return Err(Grib2Error::Truncated {
            expected: needed_bits.div_ceil(8) as u64,
            actual: packed_data.len() as u64,
        });
    }

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;

    for i in 0..num_points {
        if !present(i) {
            values.push(MISSING);
            continue;
        }

        let packed = if bits_per_value == 0 {
            0
        } else {
            extract_bits(packed_data, bit_position, bits_per_value)?
        };
        bit_position += bits_per_value;

        let value = (reference + packed as f64 * binary_scale) / decimal_scale;
        values.push(value as f32);
    }

    Ok(values)
}

/// Extract bits from a byte array, MSB first.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32, Grib2Error> {
    let mut result = 0u32;

    for i in 0..num_bits {
        let absolute_bit = start_bit + i;
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8);

        let byte = data.get(byte_idx).ok_or_else(|| {
            Grib2Error::UnpackingError("Not enough data to extract bits".to_string())
        })?;

        result = (result << 1) | ((byte >> bit_idx) & 1) as u32;
    }

    Ok(result)
}

/// Decode the first field of a complete message with the `grib` crate.
///
/// Missing points come back as NaN, which is also [`MISSING`].
pub fn unpack_with_grib_crate(message: &[u8]) -> Result<Vec<f32>, Grib2Error> {
    let grib2 = grib::from_reader(Cursor::new(message))
        .map_err(|e| Grib2Error::UnpackingError(format!("grib reader: {}", e)))?;

    let (_, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| Grib2Error::UnpackingError("message contains no fields".to_string()))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder: {}", e)))?;

    let values = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("grib dispatch: {}", e)))?
        .collect::<Vec<f32>>();

    Ok(values)
}
