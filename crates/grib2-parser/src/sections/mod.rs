//! GRIB2 section parsing.
//!
//! Each GRIB2 message consists of numbered sections containing metadata,
//! grid information, and packed data. Offsets in this module are 0-based
//! from the start of the section (GRIB2 documentation counts octets from 1).

use chrono::{DateTime, NaiveDate, Utc};

use crate::Grib2Error;

/// Length of Section 0.
pub const INDICATOR_LEN: usize = 16;

/// End-of-message marker (Section 8).
pub const END_MARKER: &[u8; 4] = b"7777";

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section
#[derive(Debug, Clone, PartialEq)]
pub enum GridDefinition {
    /// Template 3.0: regular latitude/longitude
    LatLon(LatLonGrid),
    /// Template 3.30: Lambert conformal
    LambertConformal(LambertGrid),
}

/// Template 3.0 fields, angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    pub ni: u32,
    pub nj: u32,
    pub la1: f64,
    pub lo1: f64,
    pub la2: f64,
    pub lo2: f64,
    pub di: f64,
    pub dj: f64,
    pub scanning_mode: u8,
}

/// Template 3.30 fields, angles in degrees and spacing in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertGrid {
    pub earth_radius: f64,
    pub nx: u32,
    pub ny: u32,
    pub la1: f64,
    pub lo1: f64,
    pub lad: f64,
    pub lov: f64,
    pub dx: f64,
    pub dy: f64,
    pub projection_centre: u8,
    pub scanning_mode: u8,
    pub latin1: f64,
    pub latin2: f64,
}

impl GridDefinition {
    /// Grid dimensions (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            GridDefinition::LatLon(g) => (g.ni as usize, g.nj as usize),
            GridDefinition::LambertConformal(g) => (g.nx as usize, g.ny as usize),
        }
    }

    pub fn num_points(&self) -> usize {
        let (nx, ny) = self.dimensions();
        nx * ny
    }

    pub fn scanning_mode(&self) -> u8 {
        match self {
            GridDefinition::LatLon(g) => g.scanning_mode,
            GridDefinition::LambertConformal(g) => g.scanning_mode,
        }
    }
}

/// Scanning mode flag: points scan in the -i direction (east to west).
pub const SCAN_I_NEGATIVE: u8 = 0x80;
/// Scanning mode flag: points scan in the +j direction (south to north).
pub const SCAN_J_POSITIVE: u8 = 0x40;
/// Scanning mode flag: adjacent points are consecutive in j (column-major).
pub const SCAN_J_CONSECUTIVE: u8 = 0x20;
/// Scanning mode flag: alternate rows reverse direction.
pub const SCAN_BOUSTROPHEDON: u8 = 0x10;

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub parameter_short_name: String,
    pub time_unit: u8,
    pub forecast_time: u32,
    pub level_type: u8,
    pub level_value: f64,
    pub level_description: String,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub enum Bitmap {
    /// Indicator 255: every grid point has a value.
    Absent,
    /// Indicator 0: one bit per grid point, MSB first, 1 = present.
    Present(Vec<u8>),
}

// ===== Integer helpers =====
//
// GRIB2 signed integers are sign-magnitude: the high bit is the sign.

pub(crate) fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

pub(crate) fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

pub(crate) fn read_i16_sm(data: &[u8], at: usize) -> i16 {
    let raw = read_u16(data, at);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

pub(crate) fn read_i32_sm(data: &[u8], at: usize) -> i32 {
    let raw = read_u32(data, at);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn micro_degrees(value: i32) -> f64 {
    value as f64 * 1e-6
}

fn require(section: u8, data: &[u8], needed: usize) -> Result<(), Grib2Error> {
    if data.len() < needed {
        return Err(Grib2Error::InvalidSection {
            section,
            reason: format!("needs at least {} bytes, got {}", needed, data.len()),
        });
    }
    Ok(())
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < INDICATOR_LEN {
        return Err(Grib2Error::Truncated {
            expected: INDICATOR_LEN as u64,
            actual: data.len() as u64,
        });
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 5-6 reserved, 7 discipline, 8 edition, 9-16 total length
    let discipline = data[6];
    let edition = data[7];
    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let mut length = [0u8; 8];
    length.copy_from_slice(&data[8..16]);

    Ok(Indicator {
        discipline,
        edition,
        message_length: u64::from_be_bytes(length),
    })
}

/// Parse Section 1 (Identification)
pub fn parse_identification(sec: &[u8]) -> Result<Identification, Grib2Error> {
    require(1, sec, 21)?;

    let year = read_u16(sec, 12);
    let (month, day, hour, minute, second) = (sec[14], sec[15], sec[16], sec[17], sec[18]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center: read_u16(sec, 5),
        sub_center: read_u16(sec, 7),
        significance_of_reference_time: sec[11],
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: sec[19],
        data_type: sec[20],
    })
}

/// Parse Section 3 (Grid Definition)
pub fn parse_grid_definition(sec: &[u8]) -> Result<GridDefinition, Grib2Error> {
    require(3, sec, 14)?;

    // 5: source, 6-9: number of points, 10: optional list octets,
    // 11: list interpretation, 12-13: template number
    let optional_list = sec[10];
    if optional_list != 0 {
        return Err(Grib2Error::Unsupported(
            "grids with an optional list of points".to_string(),
        ));
    }

    let template = read_u16(sec, 12);
    let gd = &sec[14..];

    match template {
        0 => {
            require(3, gd, 58)?;
            Ok(GridDefinition::LatLon(LatLonGrid {
                ni: read_u32(gd, 16),
                nj: read_u32(gd, 20),
                la1: micro_degrees(read_i32_sm(gd, 32)),
                lo1: micro_degrees(read_i32_sm(gd, 36)),
                la2: micro_degrees(read_i32_sm(gd, 41)),
                lo2: micro_degrees(read_i32_sm(gd, 45)),
                di: micro_degrees(read_u32(gd, 49) as i32),
                dj: micro_degrees(read_u32(gd, 53) as i32),
                scanning_mode: gd[57],
            }))
        }
        30 => {
            require(3, gd, 67)?;
            Ok(GridDefinition::LambertConformal(LambertGrid {
                earth_radius: earth_radius(gd)?,
                nx: read_u32(gd, 16),
                ny: read_u32(gd, 20),
                la1: micro_degrees(read_i32_sm(gd, 24)),
                lo1: micro_degrees(read_i32_sm(gd, 28)),
                lad: micro_degrees(read_i32_sm(gd, 33)),
                lov: micro_degrees(read_i32_sm(gd, 37)),
                // Dx/Dy are in units of 10^-3 m
                dx: read_u32(gd, 41) as f64 / 1000.0,
                dy: read_u32(gd, 45) as f64 / 1000.0,
                projection_centre: gd[49],
                scanning_mode: gd[50],
                latin1: micro_degrees(read_i32_sm(gd, 51)),
                latin2: micro_degrees(read_i32_sm(gd, 55)),
            }))
        }
        other => Err(Grib2Error::Unsupported(format!(
            "grid definition template 3.{}",
            other
        ))),
    }
}

/// Earth radius from the shape-of-earth octets shared by templates 3.0 and 3.30.
fn earth_radius(gd: &[u8]) -> Result<f64, Grib2Error> {
    match gd[0] {
        0 => Ok(6_367_470.0),
        1 => {
            let scale = gd[1] as i32;
            let value = read_u32(gd, 2) as f64;
            if value == 0.0 {
                return Err(Grib2Error::InvalidSection {
                    section: 3,
                    reason: "earth radius specified as zero".to_string(),
                });
            }
            Ok(value / 10f64.powi(scale))
        }
        6 => Ok(6_371_229.0),
        8 => Ok(6_371_200.0),
        // Oblate shapes are approximated by the NCEP sphere
        _ => Ok(6_371_229.0),
    }
}

/// Parse Section 4 (Product Definition)
pub fn parse_product_definition(sec: &[u8], discipline: u8) -> Result<ProductDefinition, Grib2Error> {
    require(4, sec, 9)?;

    let template = read_u16(sec, 7);
    // Templates 4.0-4.15 share the leading layout through the first fixed surface.
    if template > 15 {
        return Err(Grib2Error::Unsupported(format!(
            "product definition template 4.{}",
            template
        )));
    }
    require(4, sec, 28)?;

    let parameter_category = sec[9];
    let parameter_number = sec[10];
    let time_unit = sec[17];
    let forecast_time = read_u32(sec, 18);
    let level_type = sec[22];
    let scale_factor = sec[23] as i8;
    let scaled_value = read_u32(sec, 24);

    let level_value = if scaled_value == u32::MAX {
        0.0
    } else {
        scaled_value as f64 / 10f64.powi(scale_factor as i32)
    };

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        parameter_short_name: crate::tables::parameter_short_name(
            discipline,
            parameter_category,
            parameter_number,
        ),
        time_unit,
        forecast_time,
        level_type,
        level_value,
        level_description: crate::tables::level_description(level_type, level_value),
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(sec: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    require(5, sec, 11)?;

    let num_data_points = read_u32(sec, 5);
    let template = read_u16(sec, 9);

    // Templates 5.0, 5.2, 5.3, 5.40, 5.41 share the simple-packing prefix:
    // 11-14 reference value (IEEE float), 15-16 E, 17-18 D, 19 bits per value
    let (reference_value, binary_scale_factor, decimal_scale_factor, bits_per_value) =
        if sec.len() >= 20 {
            (
                f32::from_be_bytes([sec[11], sec[12], sec[13], sec[14]]),
                read_i16_sm(sec, 15),
                read_i16_sm(sec, 17),
                sec[19],
            )
        } else {
            (0.0, 0, 0, 0)
        };

    Ok(DataRepresentation {
        num_data_points,
        template,
        reference_value,
        binary_scale_factor,
        decimal_scale_factor,
        bits_per_value,
    })
}

/// Parse Section 6 (Bitmap)
pub fn parse_bitmap(sec: &[u8]) -> Result<Bitmap, Grib2Error> {
    require(6, sec, 6)?;

    match sec[5] {
        255 => Ok(Bitmap::Absent),
        0 => Ok(Bitmap::Present(sec[6..].to_vec())),
        254 => Err(Grib2Error::Unsupported(
            "bitmap referring to a previous field".to_string(),
        )),
        other => Err(Grib2Error::Unsupported(format!(
            "predefined bitmap {}",
            other
        ))),
    }
}

/// Locate the sections of one message.
///
/// Returns `(section number, section bytes)` for the first occurrence of each
/// section between the indicator and the end marker.
pub fn split_sections(message: &[u8]) -> Result<Vec<(u8, &[u8])>, Grib2Error> {
    let mut sections = Vec::new();
    let mut offset = INDICATOR_LEN;

    loop {
        if offset + 4 <= message.len() && &message[offset..offset + 4] == END_MARKER {
            return Ok(sections);
        }

        if offset + 5 > message.len() {
            return Err(Grib2Error::Truncated {
                expected: (offset + 5) as u64,
                actual: message.len() as u64,
            });
        }

        let section_length = read_u32(message, offset) as usize;
        let number = message[offset + 4];

        if section_length < 5 || !(1..=7).contains(&number) {
            return Err(Grib2Error::InvalidSection {
                section: number,
                reason: format!("invalid section header at byte {}", offset),
            });
        }
        if offset + section_length > message.len() {
            return Err(Grib2Error::Truncated {
                expected: (offset + section_length) as u64,
                actual: message.len() as u64,
            });
        }

        // Multi-field messages repeat sections 4-7; keep the first field.
        if !sections.iter().any(|(n, _)| *n == number) {
            sections.push((number, &message[offset..offset + section_length]));
        }

        offset += section_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(read_i16_sm(&[0x80, 0x03], 0), -3);
        assert_eq!(read_i16_sm(&[0x00, 0x03], 0), 3);
        assert_eq!(read_i32_sm(&[0x80, 0x00, 0x00, 0x05], 0), -5);
        assert_eq!(read_i32_sm(&[0x01, 0x42, 0x8A, 0x7B], 0), 21_138_043);
    }

    #[test]
    fn test_indicator_rejects_edition_1() {
        let mut data = b"GRIB".to_vec();
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(&[0u8; 8]);
        let err = parse_indicator(&data).unwrap_err();
        assert!(matches!(err, Grib2Error::InvalidFormat(_)));
    }

    #[test]
    fn test_indicator_rejects_bad_magic() {
        let err = parse_indicator(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, Grib2Error::InvalidFormat(_)));
    }

    #[test]
    fn test_split_sections_detects_truncation() {
        let mut message = b"GRIB\0\0\0\x02".to_vec();
        message.extend_from_slice(&100u64.to_be_bytes());
        // Section 1 header claims 21 bytes but only 10 follow
        message.extend_from_slice(&21u32.to_be_bytes());
        message.push(1);
        message.extend_from_slice(&[0u8; 5]);

        let err = split_sections(&message).unwrap_err();
        assert!(matches!(err, Grib2Error::Truncated { .. }));
    }
}
