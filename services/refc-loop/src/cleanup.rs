//! Removal of the previous run's artifacts from the output directory.

use std::path::Path;

use tracing::{debug, info};

use crate::error::FatalError;

/// True for frame files written by the renderer (`hrrr_refl_07f.png`).
pub fn is_frame_file(name: &str) -> bool {
    name.strip_prefix("hrrr_refl_")
        .and_then(|rest| rest.strip_suffix("f.png"))
        .map_or(false, |hour| !hour.is_empty() && hour.bytes().all(|b| b.is_ascii_digit()))
}

/// Create `output_dir` if needed and delete old frames, the old loop and
/// the old run summary. Other files are left alone.
pub async fn clear_previous_outputs(
    output_dir: &Path,
    animation_file: &str,
) -> Result<usize, FatalError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| FatalError::io(output_dir, e))?;

    let mut entries = tokio::fs::read_dir(output_dir)
        .await
        .map_err(|e| FatalError::io(output_dir, e))?;

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FatalError::io(output_dir, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !(is_frame_file(name) || name == animation_file || name == crate::summary::SUMMARY_FILE) {
            continue;
        }

        let path = entry.path();
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| FatalError::io(&path, e))?;
        debug!(path = %path.display(), "Removed previous output");
        removed += 1;
    }

    if removed > 0 {
        info!(dir = %output_dir.display(), removed, "Cleared previous run outputs");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_file_names() {
        assert!(is_frame_file("hrrr_refl_00f.png"));
        assert!(is_frame_file("hrrr_refl_47f.png"));
        assert!(!is_frame_file("hrrr_refl_f.png"));
        assert!(!is_frame_file("hrrr_refl_0af.png"));
        assert!(!is_frame_file("notes.png"));
    }

    #[tokio::test]
    async fn test_clears_only_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["hrrr_refl_00f.png", "hrrr_refl_01f.png", "radar_loop.gif", "keep.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let removed = clear_previous_outputs(dir.path(), "radar_loop.gif").await.unwrap();
        assert_eq!(removed, 3);
        assert!(dir.path().join("keep.txt").exists());
        assert!(!dir.path().join("radar_loop.gif").exists());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("hrrr_simZ");
        assert_eq!(clear_previous_outputs(&dir, "radar_loop.gif").await.unwrap(), 0);
        assert!(dir.is_dir());
    }
}
