//! Error taxonomy of a run.
//!
//! [`HourError`] is contained by the walker: the hour is skipped and the run
//! goes on. [`FatalError`] stops the run before any hour is attempted.

use std::fmt;

use grib2_parser::{Grib2Error, IdxError};
use serde::Serialize;

use crate::fetch::FetchError;

/// Step of the per-hour pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FetchIndex,
    Resolve,
    FetchRange,
    Decode,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FetchIndex => "fetch_index",
            Stage::Resolve => "resolve",
            Stage::FetchRange => "fetch_range",
            Stage::Decode => "decode",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one forecast hour was skipped.
#[derive(Debug, thiserror::Error)]
pub enum HourError {
    #[error("{0}")]
    IndexNotFound(#[source] IdxError),

    #[error("{0}")]
    IndexMalformed(#[source] IdxError),

    #[error("{stage} failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: FetchError,
    },

    #[error("Decode failed: {0}")]
    Decode(#[from] Grib2Error),

    #[error("Render failed: {0:#}")]
    Render(anyhow::Error),

    #[error("{stage} task aborted: {reason}")]
    Aborted { stage: Stage, reason: String },
}

impl From<IdxError> for HourError {
    fn from(e: IdxError) -> Self {
        match e {
            IdxError::NotFound { .. } => HourError::IndexNotFound(e),
            IdxError::Malformed { .. } => HourError::IndexMalformed(e),
        }
    }
}

impl HourError {
    pub fn stage(&self) -> Stage {
        match self {
            HourError::IndexNotFound(_) | HourError::IndexMalformed(_) => Stage::Resolve,
            HourError::Transport { stage, .. } | HourError::Aborted { stage, .. } => *stage,
            HourError::Decode(_) => Stage::Decode,
            HourError::Render(_) => Stage::Render,
        }
    }

    /// Short machine-readable kind for logs and the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            HourError::IndexNotFound(_) => "index_not_found",
            HourError::IndexMalformed(_) => "index_malformed",
            HourError::Transport { .. } => "transport",
            HourError::Decode(_) => "decode",
            HourError::Render(_) => "render",
            HourError::Aborted { .. } => "aborted",
        }
    }
}

/// Conditions that end the run before the horizon is walked.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Archive unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FatalError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        FatalError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
