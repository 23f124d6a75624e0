//! Reflectivity colour ramp.
//!
//! Values are binned into filled bands (0, 5, ..., 80 dBZ). Each band is
//! coloured by its midpoint, normalised over -25..80 dBZ and looked up on an
//! approximation of the NCAR "gist" ramp.

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear color interpolation
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;

    Color::new(
        ((color1.r as f32 * t_inv) + (color2.r as f32 * t)) as u8,
        ((color1.g as f32 * t_inv) + (color2.g as f32 * t)) as u8,
        ((color1.b as f32 * t_inv) + (color2.b as f32 * t)) as u8,
        ((color1.a as f32 * t_inv) + (color2.a as f32 * t)) as u8,
    )
}

/// Control points of the ramp, position in 0..1.
const NCAR_STOPS: [(f32, Color); 14] = [
    (0.00, Color::rgb(0, 0, 128)),
    (0.08, Color::rgb(0, 60, 255)),
    (0.16, Color::rgb(0, 200, 255)),
    (0.23, Color::rgb(0, 250, 200)),
    (0.30, Color::rgb(0, 240, 80)),
    (0.39, Color::rgb(40, 255, 0)),
    (0.47, Color::rgb(120, 230, 0)),
    (0.55, Color::rgb(220, 255, 40)),
    (0.63, Color::rgb(255, 210, 0)),
    (0.71, Color::rgb(255, 120, 0)),
    (0.79, Color::rgb(255, 0, 0)),
    (0.87, Color::rgb(240, 0, 220)),
    (0.93, Color::rgb(170, 60, 255)),
    (1.00, Color::rgb(255, 248, 255)),
];

/// Look up a normalised (0..1) position on the ramp.
pub fn ncar_color(t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    for pair in NCAR_STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            return interpolate_color(c0, c1, (t - t0) / (t1 - t0));
        }
    }
    NCAR_STOPS[NCAR_STOPS.len() - 1].1
}

/// Banded colour scale for composite reflectivity.
#[derive(Debug, Clone)]
pub struct ReflectivityScale {
    levels: Vec<f32>,
    colors: Vec<Color>,
}

impl Default for ReflectivityScale {
    fn default() -> Self {
        Self::new(0.0, 80.0, 5.0, (-25.0, 80.0))
    }
}

impl ReflectivityScale {
    /// Bands from `min` to `max` in `step` increments, coloured over `norm`.
    pub fn new(min: f32, max: f32, step: f32, norm: (f32, f32)) -> Self {
        let count = ((max - min) / step).round().max(1.0) as usize;
        let levels: Vec<f32> = (0..=count).map(|i| min + i as f32 * step).collect();

        let span = norm.1 - norm.0;
        let colors = levels
            .windows(2)
            .map(|band| {
                let mid = (band[0] + band[1]) / 2.0;
                ncar_color((mid - norm.0) / span)
            })
            .collect();

        Self { levels, colors }
    }

    /// Band boundaries, lowest first.
    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    /// One colour per band.
    pub fn band_colors(&self) -> &[Color] {
        &self.colors
    }

    /// Colour for a value, or `None` when missing or below the first level.
    ///
    /// Values above the last level fall in the top band.
    pub fn color_for(&self, value: f32) -> Option<Color> {
        if value.is_nan() || value < self.levels[0] {
            return None;
        }
        let band = self.levels[1..]
            .iter()
            .position(|&upper| value < upper)
            .unwrap_or(self.colors.len() - 1);
        Some(self.colors[band])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let scale = ReflectivityScale::default();
        assert_eq!(scale.levels().len(), 17);
        assert_eq!(scale.levels()[0], 0.0);
        assert_eq!(scale.levels()[16], 80.0);
        assert_eq!(scale.band_colors().len(), 16);
    }

    #[test]
    fn test_values_share_band_color() {
        let scale = ReflectivityScale::default();
        assert_eq!(scale.color_for(20.0), scale.color_for(24.9));
        assert_ne!(scale.color_for(24.9), scale.color_for(25.0));
        assert_eq!(scale.color_for(95.0), scale.color_for(79.0));
    }

    #[test]
    fn test_missing_and_negative_have_no_color() {
        let scale = ReflectivityScale::default();
        assert_eq!(scale.color_for(f32::NAN), None);
        assert_eq!(scale.color_for(-1.0), None);
        assert!(scale.color_for(0.0).is_some());
    }

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(ncar_color(0.0), Color::rgb(0, 0, 128));
        assert_eq!(ncar_color(1.0), Color::rgb(255, 248, 255));
        assert_eq!(ncar_color(-3.0), ncar_color(0.0));
    }

    #[test]
    fn test_interpolate_midpoint() {
        let c = interpolate_color(Color::rgb(0, 0, 0), Color::rgb(200, 100, 50), 0.5);
        assert_eq!(c, Color::rgb(100, 50, 25));
    }
}
