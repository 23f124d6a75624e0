//! Coordinate grids for supported grid definitions.

use projection::{normalize_lon, LambertConformal, LambertParams};

use crate::sections::{
    GridDefinition, LambertGrid, LatLonGrid, SCAN_BOUSTROPHEDON, SCAN_I_NEGATIVE,
    SCAN_J_CONSECUTIVE, SCAN_J_POSITIVE,
};
use crate::Grib2Error;

/// Longitude and latitude of every grid point in data (scan) order.
///
/// Longitudes are normalized to [-180, 180).
pub fn coordinate_grids(grid: &GridDefinition) -> Result<(Vec<f64>, Vec<f64>), Grib2Error> {
    let scan = grid.scanning_mode();
    if scan & (SCAN_J_CONSECUTIVE | SCAN_BOUSTROPHEDON) != 0 {
        return Err(Grib2Error::Unsupported(format!(
            "scanning mode {:#04x}",
            scan
        )));
    }

    match grid {
        GridDefinition::LatLon(g) => Ok(latlon_grids(g)),
        GridDefinition::LambertConformal(g) => lambert_grids(g),
    }
}

fn latlon_grids(g: &LatLonGrid) -> (Vec<f64>, Vec<f64>) {
    let (ni, nj) = (g.ni as usize, g.nj as usize);

    let dlat = if nj > 1 {
        (g.la2 - g.la1) / (nj - 1) as f64
    } else {
        0.0
    };

    let mut span = g.lo2 - g.lo1;
    if g.scanning_mode & SCAN_I_NEGATIVE == 0 {
        if span < 0.0 {
            span += 360.0;
        }
    } else if span > 0.0 {
        span -= 360.0;
    }
    let dlon = if ni > 1 { span / (ni - 1) as f64 } else { 0.0 };

    let mut lons = Vec::with_capacity(ni * nj);
    let mut lats = Vec::with_capacity(ni * nj);
    for row in 0..nj {
        let lat = g.la1 + row as f64 * dlat;
        for col in 0..ni {
            lons.push(normalize_lon(g.lo1 + col as f64 * dlon));
            lats.push(lat);
        }
    }

    (lons, lats)
}

fn lambert_grids(g: &LambertGrid) -> Result<(Vec<f64>, Vec<f64>), Grib2Error> {
    if g.scanning_mode & SCAN_I_NEGATIVE != 0 {
        return Err(Grib2Error::Unsupported(
            "Lambert grid scanned east to west".to_string(),
        ));
    }

    let params = LambertParams {
        lat1: g.la1,
        lon1: normalize_lon(g.lo1),
        lov: normalize_lon(g.lov),
        latin1: g.latin1,
        latin2: g.latin2,
        dx: g.dx,
        dy: g.dy,
        nx: g.nx as usize,
        ny: g.ny as usize,
        earth_radius: g.earth_radius,
    };

    let proj = LambertConformal::new(params).map_err(|e| Grib2Error::InvalidSection {
        section: 3,
        reason: e.to_string(),
    })?;

    // La1/Lo1 is the first point in scan order. With -j scanning that is the
    // northwest corner; the projection wants the southwest one.
    if g.scanning_mode & SCAN_J_POSITIVE == 0 {
        let (lat_sw, lon_sw) = proj.grid_to_geo(0.0, -((g.ny as f64) - 1.0));
        let mut params = params;
        params.lat1 = lat_sw;
        params.lon1 = lon_sw;
        let proj = LambertConformal::new(params).map_err(|e| Grib2Error::InvalidSection {
            section: 3,
            reason: e.to_string(),
        })?;
        return Ok(proj.coordinate_grids(true));
    }

    Ok(proj.coordinate_grids(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latlon(scan: u8, lo1: f64, lo2: f64) -> GridDefinition {
        GridDefinition::LatLon(LatLonGrid {
            ni: 3,
            nj: 2,
            la1: 37.0,
            lo1,
            la2: 36.0,
            lo2,
            di: 1.0,
            dj: 1.0,
            scanning_mode: scan,
        })
    }

    #[test]
    fn test_latlon_north_to_south_rows() {
        let (lons, lats) = coordinate_grids(&latlon(0, 268.0, 270.0)).unwrap();
        assert_eq!(lons, vec![-92.0, -91.0, -90.0, -92.0, -91.0, -90.0]);
        assert_eq!(lats, vec![37.0, 37.0, 37.0, 36.0, 36.0, 36.0]);
    }

    #[test]
    fn test_latlon_crossing_prime_meridian() {
        let (lons, _) = coordinate_grids(&latlon(0, 359.0, 1.0)).unwrap();
        assert_eq!(&lons[..3], &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_column_major_scan_rejected() {
        let err = coordinate_grids(&latlon(SCAN_J_CONSECUTIVE, 0.0, 2.0)).unwrap_err();
        assert!(matches!(err, Grib2Error::Unsupported(_)));
    }

    #[test]
    fn test_lambert_first_point_matches_la1() {
        let grid = GridDefinition::LambertConformal(LambertGrid {
            earth_radius: 6_371_229.0,
            nx: 5,
            ny: 4,
            la1: 21.138123,
            lo1: 237.280472,
            lad: 38.5,
            lov: 262.5,
            dx: 3000.0,
            dy: 3000.0,
            projection_centre: 0,
            scanning_mode: SCAN_J_POSITIVE,
            latin1: 38.5,
            latin2: 38.5,
        });

        let (lons, lats) = coordinate_grids(&grid).unwrap();
        assert_eq!(lons.len(), 20);
        assert!((lats[0] - 21.138123).abs() < 1e-6);
        assert!((lons[0] - -122.719528).abs() < 1e-6);
        assert!(lats[15] > lats[0]);
    }
}
