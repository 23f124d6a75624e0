//! Per-hour outcomes and the run summary.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{HourError, Stage};

/// File name of the summary written next to the frames.
pub const SUMMARY_FILE: &str = "run_summary.json";

/// What happened to one forecast hour.
#[derive(Debug, Clone, Serialize)]
pub struct HourOutcome {
    pub forecast_hour: u32,
    #[serde(flatten)]
    pub status: HourStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HourStatus {
    Rendered {
        frame: PathBuf,
        valid_time: DateTime<Utc>,
    },
    Failed {
        stage: Stage,
        kind: String,
        reason: String,
        url: String,
    },
}

impl HourOutcome {
    pub fn rendered(forecast_hour: u32, frame: PathBuf, valid_time: DateTime<Utc>) -> Self {
        Self {
            forecast_hour,
            status: HourStatus::Rendered { frame, valid_time },
        }
    }

    pub fn failed(forecast_hour: u32, error: &HourError, url: impl Into<String>) -> Self {
        Self {
            forecast_hour,
            status: HourStatus::Failed {
                stage: error.stage(),
                kind: error.kind().to_string(),
                reason: error.to_string(),
                url: url.into(),
            },
        }
    }

    pub fn frame(&self) -> Option<&Path> {
        match &self.status {
            HourStatus::Rendered { frame, .. } => Some(frame),
            HourStatus::Failed { .. } => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.frame().is_some()
    }
}

/// How the run ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every hour produced a frame.
    Complete,
    /// Some hours failed; the loop has gaps.
    Partial,
    /// No hour produced a frame; no loop was written.
    AllFailed,
}

/// Aggregate of a run, ordered by forecast hour.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_time: DateTime<Utc>,
    pub horizon_hours: u32,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_hours: Vec<u32>,
    pub hours: Vec<HourOutcome>,
    pub animation: Option<PathBuf>,
    pub assembly_error: Option<String>,
}

impl RunSummary {
    pub fn new(run_time: DateTime<Utc>, horizon_hours: u32, hours: Vec<HourOutcome>) -> Self {
        let failed_hours: Vec<u32> = hours
            .iter()
            .filter(|h| !h.is_rendered())
            .map(|h| h.forecast_hour)
            .collect();

        Self {
            run_time,
            horizon_hours,
            succeeded: hours.len() - failed_hours.len(),
            failed: failed_hours.len(),
            failed_hours,
            hours,
            animation: None,
            assembly_error: None,
        }
    }

    /// Frames in forecast-hour order, failed hours omitted.
    pub fn frames(&self) -> Vec<PathBuf> {
        self.hours
            .iter()
            .filter_map(|h| h.frame().map(Path::to_path_buf))
            .collect()
    }

    pub fn status(&self) -> RunStatus {
        match (self.succeeded, self.failed) {
            (0, _) => RunStatus::AllFailed,
            (_, 0) => RunStatus::Complete,
            _ => RunStatus::Partial,
        }
    }

    /// Write `run_summary.json` into `dir`.
    pub fn write_json(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(SUMMARY_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn log(&self) {
        for hour in &self.hours {
            if let HourStatus::Failed {
                stage, kind, reason, ..
            } = &hour.status
            {
                warn!(
                    forecast_hour = hour.forecast_hour,
                    stage = %stage,
                    kind = %kind,
                    reason = %reason,
                    "Hour missing from loop"
                );
            }
        }

        info!(
            run_time = %self.run_time,
            horizon_hours = self.horizon_hours,
            succeeded = self.succeeded,
            failed = self.failed,
            failed_hours = ?self.failed_hours,
            animation = ?self.animation,
            status = ?self.status(),
            "Run complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use chrono::TimeZone;

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn failure(hour: u32) -> HourOutcome {
        let error = HourError::Transport {
            stage: Stage::FetchRange,
            source: FetchError::Status {
                url: "http://archive/f01".to_string(),
                status: 404,
            },
        };
        HourOutcome::failed(hour, &error, "http://archive/f01")
    }

    #[test]
    fn test_counts_and_frames() {
        let hours = vec![
            HourOutcome::rendered(0, PathBuf::from("out/hrrr_refl_00f.png"), run_time()),
            failure(1),
            HourOutcome::rendered(2, PathBuf::from("out/hrrr_refl_02f.png"), run_time()),
        ];
        let summary = RunSummary::new(run_time(), 3, hours);

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_hours, vec![1]);
        assert_eq!(summary.status(), RunStatus::Partial);
        assert_eq!(
            summary.frames(),
            vec![
                PathBuf::from("out/hrrr_refl_00f.png"),
                PathBuf::from("out/hrrr_refl_02f.png")
            ]
        );
    }

    #[test]
    fn test_status_extremes() {
        let none = RunSummary::new(run_time(), 2, vec![failure(0), failure(1)]);
        assert_eq!(none.status(), RunStatus::AllFailed);
        assert!(none.frames().is_empty());

        let all = RunSummary::new(
            run_time(),
            1,
            vec![HourOutcome::rendered(0, PathBuf::from("a.png"), run_time())],
        );
        assert_eq!(all.status(), RunStatus::Complete);
    }

    #[test]
    fn test_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let summary = RunSummary::new(run_time(), 2, vec![
            HourOutcome::rendered(0, PathBuf::from("a.png"), run_time()),
            failure(1),
        ]);
        let path = summary.write_json(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), SUMMARY_FILE);

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["failed_hours"][0], 1);
        assert_eq!(value["hours"][0]["status"], "rendered");
        assert_eq!(value["hours"][1]["status"], "failed");
        assert_eq!(value["hours"][1]["stage"], "fetch_range");
        assert_eq!(value["hours"][1]["kind"], "transport");
        assert_eq!(value["hours"][1]["forecast_hour"], 1);
    }
}
