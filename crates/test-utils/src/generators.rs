//! Test data generators for creating synthetic reflectivity data.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite.

/// Creates a grid with a single circular storm cell.
///
/// Reflectivity peaks at `peak_dbz` in cell (`center_col`, `center_row`) and
/// falls off linearly to 0 dBZ at `radius` cells. Values outside the radius
/// are exactly 0.
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::storm_cell_grid;
///
/// let grid = storm_cell_grid(10, 5, (4, 2), 50.0, 3.0);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[2 * 10 + 4], 50.0);
/// assert_eq!(grid[0], 0.0);
/// ```
pub fn storm_cell_grid(
    width: usize,
    height: usize,
    center: (usize, usize),
    peak_dbz: f32,
    radius: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - center.0 as f32;
            let dy = row as f32 - center.1 as f32;
            let distance = (dx * dx + dy * dy).sqrt();
            let falloff = (1.0 - distance / radius).max(0.0);
            data.push(peak_dbz * falloff);
        }
    }
    data
}

/// Creates a grid stepping through the reflectivity range.
///
/// Cell `i` (row-major) holds `(i % 18) * 5` dBZ, so every 5 dBZ band from
/// 0 to 85 appears.
pub fn reflectivity_bands_grid(width: usize, height: usize) -> Vec<f32> {
    (0..width * height).map(|i| ((i % 18) * 5) as f32).collect()
}
