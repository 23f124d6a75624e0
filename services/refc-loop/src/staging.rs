//! Per-hour scratch files for fetched payloads.
//!
//! Each forecast hour stages into its own file named after the target stem,
//! so hours processed concurrently never write to the same path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use radar_common::ForecastTarget;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::FatalError;

/// What this run put on disk, and therefore what it may remove.
#[derive(Debug, Default)]
struct Staged {
    created_dir: bool,
    paths: BTreeSet<PathBuf>,
}

#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    keep: bool,
    staged: Mutex<Staged>,
}

impl StagingArea {
    /// `keep` leaves staged files in place for inspection.
    pub fn new(dir: impl Into<PathBuf>, keep: bool) -> Self {
        Self {
            dir: dir.into(),
            keep,
            staged: Mutex::new(Staged::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed. Only a directory created here is
    /// removed by [`finish`](Self::finish).
    pub async fn prepare(&self) -> Result<(), FatalError> {
        let exists = tokio::fs::try_exists(&self.dir)
            .await
            .map_err(|e| FatalError::io(&self.dir, e))?;
        if !exists {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| FatalError::io(&self.dir, e))?;
        }
        self.staged.lock().await.created_dir = !exists;
        Ok(())
    }

    /// Where the ranged payload of `target` is written.
    pub fn payload_path(&self, target: &ForecastTarget) -> PathBuf {
        self.dir.join(format!("{}.grib2", target.stem()))
    }

    /// Payload path for `target`, recorded for removal at the end of the run.
    pub async fn claim(&self, target: &ForecastTarget) -> PathBuf {
        let path = self.payload_path(target);
        self.staged.lock().await.paths.insert(path.clone());
        path
    }

    /// Remove a staged file once it has been consumed.
    pub async fn discard(&self, path: &Path) {
        if self.keep {
            return;
        }
        remove_staged_file(path).await;
    }

    /// Remove what this run staged. The directory itself goes only when
    /// `prepare` created it and nothing else was put there.
    pub async fn finish(&self) {
        if self.keep {
            debug!(dir = %self.dir.display(), "Keeping staging directory");
            return;
        }

        let staged = std::mem::take(&mut *self.staged.lock().await);
        for path in &staged.paths {
            remove_staged_file(path).await;
        }
        if !staged.created_dir {
            return;
        }
        match tokio::fs::remove_dir(&self.dir).await {
            Ok(()) => debug!(dir = %self.dir.display(), "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Left staging directory in place"),
        }
    }
}

async fn remove_staged_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed staged file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn target(hour: u32) -> ForecastTarget {
        ForecastTarget::from_reference(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), hour)
    }

    #[test]
    fn test_payload_paths_are_per_hour() {
        let staging = StagingArea::new("/tmp/stage", false);
        assert_eq!(
            staging.payload_path(&target(3)),
            PathBuf::from("/tmp/stage/hrrr_20240501_12z_f03.grib2")
        );
        assert_ne!(staging.payload_path(&target(3)), staging.payload_path(&target(4)));
    }

    #[tokio::test]
    async fn test_discard_and_finish() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(root.path().join("stage"), false);
        staging.prepare().await.unwrap();

        let path = staging.claim(&target(0)).await;
        tokio::fs::write(&path, b"GRIB").await.unwrap();
        staging.discard(&path).await;
        assert!(!path.exists());

        // Missing files are not an error
        staging.discard(&path).await;

        staging.finish().await;
        assert!(!staging.dir().exists());
    }

    #[tokio::test]
    async fn test_keep_leaves_files() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(root.path().join("stage"), true);
        staging.prepare().await.unwrap();

        let path = staging.claim(&target(1)).await;
        tokio::fs::write(&path, b"GRIB").await.unwrap();
        staging.discard(&path).await;
        staging.finish().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_finish_leaves_existing_directory_and_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let notes = root.path().join("notes.txt");
        tokio::fs::write(&notes, b"not ours").await.unwrap();

        let staging = StagingArea::new(root.path(), false);
        staging.prepare().await.unwrap();
        let leftover = staging.claim(&target(2)).await;
        tokio::fs::write(&leftover, b"GRIB").await.unwrap();

        staging.finish().await;
        assert!(!leftover.exists());
        assert!(notes.exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_finish_keeps_created_directory_with_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(root.path().join("stage"), false);
        staging.prepare().await.unwrap();
        let other = staging.dir().join("hrrr_refl_00f.png");
        tokio::fs::write(&other, b"png").await.unwrap();

        staging.finish().await;
        assert!(other.exists());
    }
}
