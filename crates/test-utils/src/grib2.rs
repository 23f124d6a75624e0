//! Synthetic GRIB2 messages for parser and pipeline tests.
//!
//! Messages use simple packing (template 5.0) with 16 bits per value and a
//! bitmap whenever the data contains NaN.

/// Grid definition written into Section 3.
#[derive(Debug, Clone)]
pub enum TestGrid {
    /// Template 3.0. Angles in microdegrees.
    LatLon {
        ni: u32,
        nj: u32,
        la1: i32,
        lo1: i32,
        la2: i32,
        lo2: i32,
        di: u32,
        dj: u32,
    },
    /// Template 3.30. Angles in microdegrees, spacing in millimeters.
    Lambert {
        nx: u32,
        ny: u32,
        la1: i32,
        lo1: i32,
        lov: i32,
        latin: i32,
        dx: u32,
        dy: u32,
    },
}

impl TestGrid {
    fn dims(&self) -> (u32, u32) {
        match self {
            TestGrid::LatLon { ni, nj, .. } => (*ni, *nj),
            TestGrid::Lambert { nx, ny, .. } => (*nx, *ny),
        }
    }
}

/// Build a minimal GRIB2 message with the specified parameters
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    grid: TestGrid,
    scanning_mode: u8,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    time_unit: u8,
    forecast_time: u32,
    data_values: Vec<f32>,
}

/// GRIB2 sign-magnitude encoding of a 32-bit integer.
pub fn sign_magnitude_i32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

/// GRIB2 sign-magnitude encoding of a 16-bit integer.
pub fn sign_magnitude_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

impl Grib2Builder {
    /// Composite reflectivity on a small 0.5 degree lat/lon grid over the
    /// Southeast US, rows scanned north to south.
    pub fn latlon_refc() -> Self {
        let (ni, nj) = (8, 6);
        Self::refc(
            TestGrid::LatLon {
                ni,
                nj,
                la1: 37_000_000,
                lo1: 268_000_000, // -92.0
                la2: 34_500_000,
                lo2: 271_500_000, // -88.5
                di: 500_000,
                dj: 500_000,
            },
            0,
        )
    }

    /// Composite reflectivity on a corner of the HRRR Lambert grid, rows
    /// scanned south to north like the operational files.
    pub fn lambert_refc(nx: u32, ny: u32) -> Self {
        Self::refc(
            TestGrid::Lambert {
                nx,
                ny,
                la1: 21_138_123,
                lo1: 237_280_472,
                lov: 262_500_000,
                latin: 38_500_000,
                dx: 3_000_000,
                dy: 3_000_000,
            },
            0b0100_0000,
        )
    }

    fn refc(grid: TestGrid, scanning_mode: u8) -> Self {
        let (nx, ny) = grid.dims();
        Self {
            discipline: 0,
            center: 7,
            year: 2024,
            month: 5,
            day: 1,
            hour: 12,
            grid,
            scanning_mode,
            param_category: 16,
            param_number: 196,
            level_type: 10,
            level_value: 0,
            time_unit: 1,
            forecast_time: 0,
            data_values: vec![0.0; (nx * ny) as usize],
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.time_unit = 1;
        self.forecast_time = hour;
        self
    }

    /// Forecast offset in an arbitrary GRIB2 time unit (code table 4.4).
    pub fn with_forecast_time(mut self, unit: u8, amount: u32) -> Self {
        self.time_unit = unit;
        self.forecast_time = amount;
        self
    }

    pub fn with_scanning_mode(mut self, mode: u8) -> Self {
        self.scanning_mode = mode;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; self.num_points()];
        self
    }

    /// Values in scan order. NaN entries are written as bitmap gaps.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    pub fn num_points(&self) -> usize {
        let (nx, ny) = self.grid.dims();
        (nx * ny) as usize
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];

        let message_length = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]); // Reserved
        message.push(self.discipline);
        message.push(2); // Edition 2
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Significance of reference time (start of forecast)
        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0); // Minute
        section.push(0); // Second
        section.push(0); // Production status (operational)
        section.push(1); // Type of data (forecast)
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let (template, body) = match &self.grid {
            TestGrid::LatLon {
                ni,
                nj,
                la1,
                lo1,
                la2,
                lo2,
                di,
                dj,
            } => {
                let mut body = earth_shape();
                body.extend_from_slice(&ni.to_be_bytes());
                body.extend_from_slice(&nj.to_be_bytes());
                body.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
                body.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // Subdivisions
                body.extend_from_slice(&sign_magnitude_i32(*la1));
                body.extend_from_slice(&sign_magnitude_i32(*lo1));
                body.push(48); // Resolution and component flags
                body.extend_from_slice(&sign_magnitude_i32(*la2));
                body.extend_from_slice(&sign_magnitude_i32(*lo2));
                body.extend_from_slice(&di.to_be_bytes());
                body.extend_from_slice(&dj.to_be_bytes());
                body.push(self.scanning_mode);
                (0u16, body)
            }
            TestGrid::Lambert {
                nx,
                ny,
                la1,
                lo1,
                lov,
                latin,
                dx,
                dy,
            } => {
                let mut body = earth_shape();
                body.extend_from_slice(&nx.to_be_bytes());
                body.extend_from_slice(&ny.to_be_bytes());
                body.extend_from_slice(&sign_magnitude_i32(*la1));
                body.extend_from_slice(&sign_magnitude_i32(*lo1));
                body.push(8); // Resolution and component flags
                body.extend_from_slice(&sign_magnitude_i32(*latin)); // LaD
                body.extend_from_slice(&sign_magnitude_i32(*lov));
                body.extend_from_slice(&dx.to_be_bytes());
                body.extend_from_slice(&dy.to_be_bytes());
                body.push(0); // Projection centre flag
                body.push(self.scanning_mode);
                body.extend_from_slice(&sign_magnitude_i32(*latin)); // Latin1
                body.extend_from_slice(&sign_magnitude_i32(*latin)); // Latin2
                body.extend_from_slice(&sign_magnitude_i32(-90_000_000)); // Southern pole lat
                body.extend_from_slice(&0u32.to_be_bytes()); // Southern pole lon
                (30u16, body)
            }
        };

        let mut section = Vec::with_capacity(14 + body.len());
        section.extend_from_slice(&(14 + body.len() as u32).to_be_bytes());
        section.push(3);
        section.push(0); // Source of grid definition
        section.extend_from_slice(&(self.num_points() as u32).to_be_bytes());
        section.push(0); // Number of octets for optional list
        section.push(0); // Interpretation of optional list
        section.extend_from_slice(&template.to_be_bytes());
        section.extend_from_slice(&body);
        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(34);
        section.extend_from_slice(&34u32.to_be_bytes());
        section.push(4);
        section.extend_from_slice(&0u16.to_be_bytes()); // Number of coordinate values
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0
        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2); // Type of generating process (forecast)
        section.push(0); // Background generating process
        section.push(83); // Analysis or forecast process (HRRR)
        section.extend_from_slice(&0u16.to_be_bytes()); // Hours of cutoff
        section.push(0); // Minutes of cutoff
        section.push(self.time_unit);
        section.extend_from_slice(&self.forecast_time.to_be_bytes());
        section.push(self.level_type);
        section.push(0); // Scale factor
        section.extend_from_slice(&self.level_value.to_be_bytes());
        section.push(255); // Type of second fixed surface (none)
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section
    }

    fn present_values(&self) -> Vec<f32> {
        self.data_values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect()
    }

    /// Reference value, binary scale factor and bits per value.
    fn packing(&self) -> (f32, i16, u8) {
        let present = self.present_values();
        let (min_val, max_val) = present.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), &v| (min.min(v), max.max(v)),
        );

        if present.is_empty() {
            return (0.0, 0, 0);
        }

        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val, 0, 0);
        }

        // value = R + X * 2^E with X filling 16 bits
        let binary_scale_factor = (range / 65535.0).log2().ceil() as i16;
        (min_val, binary_scale_factor, 16)
    }

    fn build_section5(&self) -> Vec<u8> {
        let (reference_value, binary_scale_factor, bits_per_value) = self.packing();

        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);
        section.extend_from_slice(&(self.present_values().len() as u32).to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 5.0
        section.extend_from_slice(&reference_value.to_be_bytes());
        section.extend_from_slice(&sign_magnitude_i16(binary_scale_factor));
        section.extend_from_slice(&sign_magnitude_i16(0)); // Decimal scale factor
        section.push(bits_per_value);
        section.push(0); // Original field type (floating point)
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        if !self.data_values.iter().any(|v| v.is_nan()) {
            let mut section = Vec::with_capacity(6);
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6);
            section.push(255); // No bitmap
            return section;
        }

        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, v) in self.data_values.iter().enumerate() {
            if !v.is_nan() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }

        let mut section = Vec::with_capacity(6 + bitmap.len());
        section.extend_from_slice(&(6 + bitmap.len() as u32).to_be_bytes());
        section.push(6);
        section.push(0); // Bitmap follows
        section.extend_from_slice(&bitmap);
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let packed = self.pack_simple();

        let mut section = Vec::with_capacity(5 + packed.len());
        section.extend_from_slice(&(5 + packed.len() as u32).to_be_bytes());
        section.push(7);
        section.extend_from_slice(&packed);
        section
    }

    fn pack_simple(&self) -> Vec<u8> {
        let (reference_value, binary_scale_factor, bits_per_value) = self.packing();
        if bits_per_value == 0 {
            return Vec::new();
        }

        let binary_scale = 2f64.powi(binary_scale_factor as i32);
        self.present_values()
            .iter()
            .flat_map(|&v| {
                let x = ((v as f64 - reference_value as f64) / binary_scale).round();
                (x.clamp(0.0, 65535.0) as u16).to_be_bytes()
            })
            .collect()
    }
}

/// Shape of the earth (sphere, radius 6371229 m) plus unused radius/axis octets.
fn earth_shape() -> Vec<u8> {
    let mut body = vec![6u8];
    body.extend_from_slice(&[0u8; 15]);
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(sign_magnitude_i32(-1), [0x80, 0, 0, 1]);
        assert_eq!(sign_magnitude_i32(5), [0, 0, 0, 5]);
        assert_eq!(sign_magnitude_i16(-10), [0x80, 10]);
    }

    #[test]
    fn test_message_framing() {
        let data = Grib2Builder::latlon_refc().build();

        assert_eq!(&data[0..4], b"GRIB");
        assert_eq!(data[7], 2);
        assert_eq!(&data[data.len() - 4..], b"7777");

        let length = u64::from_be_bytes(data[8..16].try_into().unwrap());
        assert_eq!(length as usize, data.len());
    }

    #[test]
    fn test_bitmap_written_for_nan() {
        let builder = Grib2Builder::latlon_refc();
        let mut values = vec![30.0; builder.num_points()];
        values[1] = f32::NAN;
        let with_gap = builder.clone().with_data(values).build();
        let without_gap = builder.with_constant_value(30.0).build();

        // Constant field packs to zero bits; 48 points -> 6 bitmap bytes
        assert_eq!(with_gap.len(), without_gap.len() + 6);
    }
}
