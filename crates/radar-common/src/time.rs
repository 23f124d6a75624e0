//! Model run / forecast hour bookkeeping.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One archive file to process: a model run and a forecast offset.
///
/// Combines the run date and hour (the cycle) with the forecast hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastTarget {
    pub run_date: NaiveDate,
    pub run_hour: u32,
    pub forecast_hour: u32,
}

impl ForecastTarget {
    /// Target for the run containing `reference` (truncated to the hour).
    pub fn from_reference(reference: DateTime<Utc>, forecast_hour: u32) -> Self {
        Self {
            run_date: reference.date_naive(),
            run_hour: reference.hour(),
            forecast_hour,
        }
    }

    /// Model run (analysis) time.
    pub fn run_time(&self) -> DateTime<Utc> {
        let naive = self
            .run_date
            .and_hms_opt(self.run_hour.min(23), 0, 0)
            .unwrap_or_else(|| self.run_date.and_time(Default::default()));
        Utc.from_utc_datetime(&naive)
    }

    /// Nominal valid time (run time + forecast offset).
    pub fn valid_time(&self) -> DateTime<Utc> {
        self.run_time() + Duration::hours(self.forecast_hour as i64)
    }

    /// Run date formatted as `YYYYMMDD`.
    pub fn date_string(&self) -> String {
        self.run_date.format("%Y%m%d").to_string()
    }

    /// Stable per-target name, e.g. `hrrr_20240501_12z_f03`.
    pub fn stem(&self) -> String {
        format!(
            "hrrr_{}_{:02}z_f{:02}",
            self.date_string(),
            self.run_hour,
            self.forecast_hour
        )
    }
}

impl std::fmt::Display for ForecastTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:02}Z F{:02}",
            self.date_string(),
            self.run_hour,
            self.forecast_hour
        )
    }
}

/// Parse an RFC 3339 or `YYYY-MM-DDTHH:MM:SS` (UTC) timestamp.
pub fn parse_utc(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_reference() {
        let reference = Utc.with_ymd_and_hms(2024, 5, 1, 9, 47, 13).unwrap();
        let target = ForecastTarget::from_reference(reference, 7);

        assert_eq!(target.run_hour, 9);
        assert_eq!(target.date_string(), "20240501");
        assert_eq!(
            target.run_time(),
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(
            target.valid_time(),
            Utc.with_ymd_and_hms(2024, 5, 1, 16, 0, 0).unwrap()
        );
        assert_eq!(target.stem(), "hrrr_20240501_09z_f07");
    }

    #[test]
    fn test_valid_time_crosses_midnight() {
        let reference = Utc.with_ymd_and_hms(2024, 12, 31, 21, 0, 0).unwrap();
        let target = ForecastTarget::from_reference(reference, 5);
        assert_eq!(
            target.valid_time(),
            Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_utc() {
        let a = parse_utc("2024-05-01T12:00:00Z").unwrap();
        let b = parse_utc("2024-05-01T12:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_utc("yesterday").is_err());
    }
}
