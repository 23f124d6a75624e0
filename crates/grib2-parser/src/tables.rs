//! GRIB2 parameter and level lookup tables.
//!
//! Only the codes the HRRR surface files use for radar-derived products are
//! named here; everything else falls back to a numeric description that still
//! identifies the code unambiguously.

/// Parameter short name for (discipline, category, number), matching the
/// abbreviations used in NCEP `.idx` inventories.
pub fn parameter_short_name(discipline: u8, category: u8, number: u8) -> String {
    let name = match (discipline, category, number) {
        // Meteorological products, category 16: forecast radar imagery
        (0, 16, 195) => "REFD",
        (0, 16, 196) => "REFC",
        (0, 16, 197) => "RETOP",
        (0, 16, 198) => "MAXREF",
        (0, 16, 201) => "RADARVIL",
        (0, 16, 3) => "RETOP",
        (0, 16, 5) => "REFZR",
        // Moisture and mass fields that share HRRR surface files
        (0, 0, 0) => "TMP",
        (0, 1, 8) => "APCP",
        (0, 3, 0) => "PRES",
        (0, 3, 5) => "HGT",
        // Multi-radar products, discipline 209
        (209, 10, 0) => "MergedReflectivityQCComposite",
        _ => return format!("var{}_{}_{}", discipline, category, number),
    };
    name.to_string()
}

/// Level description in `.idx` style for a fixed-surface type and value.
pub fn level_description(level_type: u8, value: f64) -> String {
    match level_type {
        1 => "surface".to_string(),
        10 | 200 => "entire atmosphere".to_string(),
        100 => format!("{} mb", (value / 100.0).round()),
        101 => "mean sea level".to_string(),
        102 => format!("{} m above mean sea level", value.round()),
        103 => format!("{} m above ground", value.round()),
        _ => format!("level type {} value {}", level_type, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflectivity_names() {
        assert_eq!(parameter_short_name(0, 16, 196), "REFC");
        assert_eq!(parameter_short_name(0, 16, 195), "REFD");
        assert_eq!(parameter_short_name(0, 99, 1), "var0_99_1");
    }

    #[test]
    fn test_level_descriptions() {
        assert_eq!(level_description(10, 0.0), "entire atmosphere");
        assert_eq!(level_description(200, 0.0), "entire atmosphere");
        assert_eq!(level_description(103, 1000.0), "1000 m above ground");
        assert_eq!(level_description(100, 50000.0), "500 mb");
    }
}
