//! Drives resolve → fetch → decode → render across the forecast horizon.
//!
//! Every hour is its own failure boundary: an error in one hour is logged,
//! recorded in the summary and the walk moves on. Nothing is retried. Once
//! the horizon is exhausted the rendered frames, in forecast-hour order, go
//! to the loop assembler whether or not any hour failed.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Utc};
use futures::stream::{self, StreamExt};
use grib2_parser::{FieldDecoder, IndexResolver};
use metrics::counter;
use radar_common::{DecodedField, ForecastTarget};
use tracing::{debug, error, info, instrument, warn};

use crate::assemble::{AssemblyOutcome, LoopAssembler};
use crate::cleanup::clear_previous_outputs;
use crate::config::RunConfig;
use crate::error::{FatalError, HourError, Stage};
use crate::fetch::ArchiveSource;
use crate::render::{FrameRequest, Renderer};
use crate::staging::StagingArea;
use crate::summary::{HourOutcome, RunSummary};

/// Model run to use: `now - offset_hours`, truncated to the hour.
pub fn reference_run(now: DateTime<Utc>, offset_hours: u32) -> DateTime<Utc> {
    let shifted = now - Duration::hours(offset_hours as i64);
    shifted
        .duration_trunc(Duration::hours(1))
        .unwrap_or(shifted)
}

/// One target per forecast hour `0..horizon`, all from the same run.
pub fn plan_targets(reference: DateTime<Utc>, horizon: u32) -> Vec<ForecastTarget> {
    (0..horizon)
        .map(|hour| ForecastTarget::from_reference(reference, hour))
        .collect()
}

pub struct ForecastWalker {
    config: Arc<RunConfig>,
    source: Arc<dyn ArchiveSource>,
    renderer: Arc<dyn Renderer>,
    assembler: Arc<dyn LoopAssembler>,
    resolver: IndexResolver,
    decoder: FieldDecoder,
    staging: StagingArea,
}

impl ForecastWalker {
    pub fn new(
        config: RunConfig,
        source: Arc<dyn ArchiveSource>,
        renderer: Arc<dyn Renderer>,
        assembler: Arc<dyn LoopAssembler>,
    ) -> Self {
        let resolver = IndexResolver::new(config.field.selector());
        let mut decoder = FieldDecoder::new().with_mask_threshold(config.field.mask_threshold);
        if config.field.verify_parameter {
            decoder = decoder.expecting_parameter(config.field.variable.clone());
        }
        let staging = StagingArea::new(config.staging_dir(), false);

        Self {
            config: Arc::new(config),
            source,
            renderer,
            assembler,
            resolver,
            decoder,
            staging,
        }
    }

    /// Leave staged payloads on disk after the run.
    pub fn keep_staging(mut self, keep: bool) -> Self {
        self.staging = StagingArea::new(self.config.staging_dir(), keep);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Walk the horizon of the run at `reference`.
    ///
    /// Only setup problems are returned as errors; per-hour failures end up
    /// in the summary.
    pub async fn run(&self, reference: DateTime<Utc>) -> Result<RunSummary, FatalError> {
        self.config.validate()?;
        let schedule = &self.config.schedule;

        if self.config.http.preflight {
            self.source
                .preflight()
                .await
                .map_err(|source| FatalError::Unreachable {
                    url: self.config.source.root_url.clone(),
                    source,
                })?;
        }

        clear_previous_outputs(&self.config.output_dir, &self.config.animation.file_name).await?;
        self.staging.prepare().await?;

        let targets = plan_targets(reference, schedule.horizon_hours);
        let run_time = targets
            .first()
            .map(ForecastTarget::run_time)
            .unwrap_or(reference);
        info!(
            run_time = %run_time,
            horizon_hours = schedule.horizon_hours,
            max_concurrent = schedule.max_concurrent,
            selector = %self.resolver.selector(),
            "Walking forecast horizon"
        );

        // `buffered` yields in input order regardless of completion order
        let outcomes: Vec<HourOutcome> = stream::iter(targets)
            .map(|target| self.process_hour(target))
            .buffered(schedule.max_concurrent.max(1))
            .collect()
            .await;

        let mut summary = RunSummary::new(run_time, schedule.horizon_hours, outcomes);

        match self.assemble(summary.frames()).await {
            Ok(AssemblyOutcome::Written(path)) => summary.animation = Some(path),
            Ok(AssemblyOutcome::Empty) => {
                warn!("No forecast hour produced a frame; loop not written")
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(error = %reason, "Loop assembly failed");
                summary.assembly_error = Some(reason);
            }
        }

        self.staging.finish().await;
        Ok(summary)
    }

    #[instrument(skip_all, fields(forecast_hour = target.forecast_hour))]
    async fn process_hour(&self, target: ForecastTarget) -> HourOutcome {
        match self.try_hour(&target).await {
            Ok((frame, valid_time)) => {
                counter!("refc_hours_total", "outcome" => "rendered").increment(1);
                info!(
                    forecast_hour = target.forecast_hour,
                    valid_time = %valid_time,
                    frame = %frame.display(),
                    "Rendered forecast hour"
                );
                HourOutcome::rendered(target.forecast_hour, frame, valid_time)
            }
            Err(e) => {
                counter!("refc_hours_total", "outcome" => "failed").increment(1);
                let url = match e.stage() {
                    Stage::FetchIndex | Stage::Resolve => self.source.index_url(&target),
                    _ => self.source.archive_url(&target),
                };
                warn!(
                    url = %url,
                    forecast_hour = target.forecast_hour,
                    stage = %e.stage(),
                    error = %e,
                    "Skipping forecast hour"
                );
                HourOutcome::failed(target.forecast_hour, &e, url)
            }
        }
    }

    async fn try_hour(
        &self,
        target: &ForecastTarget,
    ) -> Result<(PathBuf, DateTime<Utc>), HourError> {
        let index = self
            .source
            .fetch_index(target)
            .await
            .map_err(|source| HourError::Transport {
                stage: Stage::FetchIndex,
                source,
            })?;

        let range = self.resolver.resolve(&index)?;
        debug!(range = %range, "Resolved byte range");

        let staged = self.staging.claim(target).await;
        let decoded = match self.source.fetch_range(target, range, &staged).await {
            Ok(bytes) => {
                debug!(bytes, "Staged payload");
                self.decode(staged.clone()).await
            }
            Err(source) => Err(HourError::Transport {
                stage: Stage::FetchRange,
                source,
            }),
        };
        self.staging.discard(&staged).await;

        let field = decoded?;
        let valid_time = field.valid_time;
        let frame = self.render(field, target.forecast_hour).await?;
        Ok((frame, valid_time))
    }

    async fn decode(&self, path: PathBuf) -> Result<DecodedField, HourError> {
        let decoder = self.decoder.clone();
        let field = tokio::task::spawn_blocking(move || decoder.decode_file(&path))
            .await
            .map_err(|e| HourError::Aborted {
                stage: Stage::Decode,
                reason: e.to_string(),
            })??;
        Ok(field)
    }

    /// Consumes the field; it is dropped once the frame is written.
    async fn render(&self, field: DecodedField, forecast_hour: u32) -> Result<PathBuf, HourError> {
        let renderer = Arc::clone(&self.renderer);
        let config = Arc::clone(&self.config);

        tokio::task::spawn_blocking(move || {
            let request = FrameRequest {
                field: &field,
                forecast_hour,
                highlight: config.render.highlight_point,
                full_extent: config.render.full_extent,
                inset_extent: config.render.inset_extent,
            };
            renderer.render(&request)
        })
        .await
        .map_err(|e| HourError::Aborted {
            stage: Stage::Render,
            reason: e.to_string(),
        })?
        .map_err(HourError::Render)
    }

    async fn assemble(&self, frames: Vec<PathBuf>) -> anyhow::Result<AssemblyOutcome> {
        info!(frames = frames.len(), "Assembling loop");
        let assembler = Arc::clone(&self.assembler);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || assembler.assemble(&frames, &config.animation)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reference_run_truncates_to_hour() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 14, 47, 13).unwrap();
        assert_eq!(
            reference_run(now, 3),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
        );
        assert_eq!(
            reference_run(Utc.with_ymd_and_hms(2024, 5, 1, 1, 5, 0).unwrap(), 3),
            Utc.with_ymd_and_hms(2024, 4, 30, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_plan_targets() {
        let reference = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let targets = plan_targets(reference, 48);

        assert_eq!(targets.len(), 48);
        assert_eq!(targets[0].forecast_hour, 0);
        assert_eq!(targets[47].forecast_hour, 47);
        assert!(targets.iter().all(|t| t.run_hour == 12));
        assert!(plan_targets(reference, 0).is_empty());
    }
}
