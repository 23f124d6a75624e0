//! Lambert Conformal Conic projection.
//!
//! HRRR is distributed on a Lambert Conformal grid (GRIB2 template 3.30).
//! The grid is defined by:
//! - First grid point: La1, Lo1
//! - Orientation / central meridian: LoV
//! - Standard parallel(s): Latin1 and Latin2 (equal for a tangent cone)
//! - Grid spacing: Dx, Dy in meters
//!
//! Grid index `i` increases eastward along x and `j` increases northward along y
//! from the first grid point.

use std::f64::consts::PI;

use crate::ProjectionError;

/// Mean earth radius used by NCEP for spherical grids (shape of earth = 6).
pub const NCEP_EARTH_RADIUS: f64 = 6_371_229.0;

/// Parameters of a Lambert Conformal grid, in degrees and meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertParams {
    /// Latitude of first grid point
    pub lat1: f64,
    /// Longitude of first grid point
    pub lon1: f64,
    /// Central meridian (LoV)
    pub lov: f64,
    /// First standard parallel
    pub latin1: f64,
    /// Second standard parallel
    pub latin2: f64,
    /// Grid spacing along x (meters)
    pub dx: f64,
    /// Grid spacing along y (meters)
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
    pub earth_radius: f64,
}

impl LambertParams {
    /// Operational HRRR CONUS grid.
    pub fn hrrr() -> Self {
        Self {
            lat1: 21.138123,
            lon1: -122.719528, // 237.280472E
            lov: -97.5,        // 262.5E
            latin1: 38.5,
            latin2: 38.5,
            dx: 3000.0,
            dy: 3000.0,
            nx: 1799,
            ny: 1059,
            earth_radius: NCEP_EARTH_RADIUS,
        }
    }
}

/// Lambert Conformal Conic projection bound to a specific grid.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    params: LambertParams,
    lon0: f64,
    /// Cone constant
    n: f64,
    /// R * F
    rf: f64,
    /// Projected coordinates of the first grid point
    x1: f64,
    y1: f64,
}

impl LambertConformal {
    /// Build the projection for the given grid.
    pub fn new(params: LambertParams) -> Result<Self, ProjectionError> {
        let to_rad = PI / 180.0;

        if params.nx == 0 || params.ny == 0 {
            return Err(ProjectionError::InvalidParameters(format!(
                "grid must have points, got {}x{}",
                params.nx, params.ny
            )));
        }
        if !(params.dx > 0.0 && params.dy > 0.0) {
            return Err(ProjectionError::InvalidParameters(format!(
                "grid spacing must be positive, got dx={} dy={}",
                params.dx, params.dy
            )));
        }
        for latin in [params.latin1, params.latin2] {
            if latin.abs() >= 90.0 || latin == 0.0 {
                return Err(ProjectionError::InvalidParameters(format!(
                    "standard parallel {} cannot define a cone",
                    latin
                )));
            }
        }

        let latin1 = params.latin1 * to_rad;
        let latin2 = params.latin2 * to_rad;

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_cos = (latin1.cos() / latin2.cos()).ln();
            let ln_tan =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_cos / ln_tan
        };

        let f = latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n) / n;
        let rf = params.earth_radius * f;
        let lon0 = params.lov * to_rad;

        let mut proj = Self {
            params,
            lon0,
            n,
            rf,
            x1: 0.0,
            y1: 0.0,
        };
        let (x1, y1) = proj.forward(params.lat1, params.lon1);
        proj.x1 = x1;
        proj.y1 = y1;
        Ok(proj)
    }

    /// Operational HRRR CONUS projection.
    pub fn hrrr() -> Self {
        // Constant parameters are known to be valid.
        match Self::new(LambertParams::hrrr()) {
            Ok(proj) => proj,
            Err(e) => unreachable!("HRRR parameters rejected: {e}"),
        }
    }

    pub fn params(&self) -> &LambertParams {
        &self.params
    }

    fn rho(&self, lat: f64) -> f64 {
        self.rf / (PI / 4.0 + lat / 2.0).tan().powf(self.n)
    }

    /// Projected (x, y) meters relative to the pole of the cone.
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let rho = self.rho(lat_deg * to_rad);
        let theta = self.n * wrap_pi(lon_deg * to_rad - self.lon0);
        (rho * theta.sin(), -rho * theta.cos())
    }

    /// Geographic (lat, lon in degrees) to fractional grid indices (i, j).
    pub fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let (x, y) = self.forward(lat_deg, lon_deg);
        (
            (x - self.x1) / self.params.dx,
            (y - self.y1) / self.params.dy,
        )
    }

    /// Fractional grid indices (i, j) to (lat, lon) in degrees.
    ///
    /// Longitudes are normalized to [-180, 180).
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;

        let x = self.x1 + i * self.params.dx;
        let y = self.y1 + j * self.params.dy;

        let sign = self.n.signum();
        let rho = sign * (x * x + y * y).sqrt();
        let theta = (sign * x).atan2(-sign * y);

        let lat = 2.0 * (self.rf / rho).powf(1.0 / self.n).atan() - PI / 2.0;
        let lon = self.lon0 + theta / self.n;

        (lat * to_deg, normalize_lon(lon * to_deg))
    }

    /// Longitude and latitude of every grid point, row-major.
    ///
    /// When `rows_north_first` is set the first row of the output is the
    /// northernmost grid row (j = ny - 1), matching data scanned in -j order.
    pub fn coordinate_grids(&self, rows_north_first: bool) -> (Vec<f64>, Vec<f64>) {
        let (nx, ny) = self.dimensions();
        let mut lons = Vec::with_capacity(nx * ny);
        let mut lats = Vec::with_capacity(nx * ny);

        for row in 0..ny {
            let j = if rows_north_first { ny - 1 - row } else { row };
            for i in 0..nx {
                let (lat, lon) = self.grid_to_geo(i as f64, j as f64);
                lats.push(lat);
                lons.push(lon);
            }
        }

        (lons, lats)
    }

    /// Check if a geographic point falls inside the grid.
    pub fn contains(&self, lat_deg: f64, lon_deg: f64) -> bool {
        let (i, j) = self.geo_to_grid(lat_deg, lon_deg);
        let (nx, ny) = self.dimensions();
        i >= 0.0 && i <= (nx - 1) as f64 && j >= 0.0 && j <= (ny - 1) as f64
    }

    /// Grid dimensions (nx, ny).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.params.nx, self.params.ny)
    }
}

fn wrap_pi(mut a: f64) -> f64 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Normalize a longitude in degrees to [-180, 180).
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.is_finite() {
        wrapped
    } else {
        lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hrrr_first_grid_point() {
        let proj = LambertConformal::hrrr();

        let (i, j) = proj.geo_to_grid(21.138123, -122.719528);
        assert!(i.abs() < 1e-6, "i should be ~0, got {}", i);
        assert!(j.abs() < 1e-6, "j should be ~0, got {}", j);

        let (lat, lon) = proj.grid_to_geo(0.0, 0.0);
        assert!((lat - 21.138123).abs() < 1e-6);
        assert!((lon - -122.719528).abs() < 1e-6);
    }

    #[test]
    fn test_hrrr_roundtrip() {
        let proj = LambertConformal::hrrr();

        for (ti, tj) in [(900.0, 500.0), (10.0, 1050.0), (1790.0, 3.0)] {
            let (lat, lon) = proj.grid_to_geo(ti, tj);
            let (i, j) = proj.geo_to_grid(lat, lon);
            assert!((i - ti).abs() < 1e-6, "i roundtrip failed: {} vs {}", ti, i);
            assert!((j - tj).abs() < 1e-6, "j roundtrip failed: {} vs {}", tj, j);
        }
    }

    #[test]
    fn test_hrrr_last_grid_point() {
        // Published corner of the HRRR CONUS domain: 47.84N, 60.92W
        let proj = LambertConformal::hrrr();
        let (lat, lon) = proj.grid_to_geo(1798.0, 1058.0);
        assert!((lat - 47.842).abs() < 0.1, "lat {}", lat);
        assert!((lon - -60.917).abs() < 0.1, "lon {}", lon);
    }

    #[test]
    fn test_huntsville_inside_grid() {
        let proj = LambertConformal::hrrr();
        assert!(proj.contains(34.7304, -86.5861));
        assert!(!proj.contains(10.0, -86.5861));
    }

    #[test]
    fn test_coordinate_grid_row_order() {
        let mut params = LambertParams::hrrr();
        params.nx = 4;
        params.ny = 3;
        let proj = LambertConformal::new(params).unwrap();

        let (lons, lats) = proj.coordinate_grids(false);
        assert_eq!(lons.len(), 12);
        assert!((lats[0] - params.lat1).abs() < 1e-9);
        assert!(lats[8] > lats[0], "rows should move north");

        let (_, lats_flipped) = proj.coordinate_grids(true);
        assert!((lats_flipped[8] - params.lat1).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut params = LambertParams::hrrr();
        params.dx = 0.0;
        assert!(LambertConformal::new(params).is_err());

        let mut params = LambertParams::hrrr();
        params.latin1 = 90.0;
        params.latin2 = 90.0;
        assert!(LambertConformal::new(params).is_err());
    }

    #[test]
    fn test_normalize_lon() {
        assert_eq!(normalize_lon(237.5), -122.5);
        assert_eq!(normalize_lon(-97.5), -97.5);
        assert_eq!(normalize_lon(180.0), -180.0);
    }
}
