//! Run configuration.
//!
//! Loaded once from an optional YAML file, overridden by CLI flags, then
//! handed to the walker as an immutable value. Every field has a default so
//! an empty file (or no file) reproduces the stock HRRR CONUS loop.

use std::path::{Component, Path, PathBuf};

use grib2_parser::FieldSelector;
use radar_common::{BoundingBox, ForecastTarget, GeoPoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FatalError;
use crate::render::frame_style;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-hour scratch files; `{output_dir}/.staging` when unset.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("hrrr_simZ")
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            field: FieldConfig::default(),
            schedule: ScheduleConfig::default(),
            output_dir: default_output_dir(),
            staging_dir: None,
            render: RenderConfig::default(),
            animation: AnimationConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Where archives live and how their URLs are built.
///
/// Templates understand `{date}` (YYYYMMDD), `{cycle:02}` and `{forecast:02}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_root_url")]
    pub root_url: String,
    #[serde(default = "default_directory_template")]
    pub directory_template: String,
    #[serde(default = "default_file_template")]
    pub file_template: String,
    #[serde(default = "default_index_suffix")]
    pub index_suffix: String,
}

fn default_root_url() -> String {
    "https://nomads.ncep.noaa.gov/pub/data/nccf/com/hrrr/prod/".to_string()
}

fn default_directory_template() -> String {
    "hrrr.{date}/conus/".to_string()
}

fn default_file_template() -> String {
    "hrrr.t{cycle:02}z.wrfprsf{forecast:02}.grib2".to_string()
}

fn default_index_suffix() -> String {
    ".idx".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            directory_template: default_directory_template(),
            file_template: default_file_template(),
            index_suffix: default_index_suffix(),
        }
    }
}

impl SourceConfig {
    /// Archive URL for one forecast target.
    pub fn archive_url(&self, target: &ForecastTarget) -> String {
        let expand = |template: &str| {
            template
                .replace("{date}", &target.date_string())
                .replace("{cycle:02}", &format!("{:02}", target.run_hour))
                .replace("{forecast:02}", &format!("{:02}", target.forecast_hour))
        };

        let mut url = self.root_url.clone();
        if !url.is_empty() && !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&expand(&self.directory_template));
        url.push_str(&expand(&self.file_template));
        url
    }

    /// Inventory URL: the archive URL plus the index suffix.
    pub fn index_url(&self, target: &ForecastTarget) -> String {
        format!("{}{}", self.archive_url(target), self.index_suffix)
    }
}

/// Which field to extract and how to post-process it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default = "default_variable")]
    pub variable: String,
    #[serde(default = "default_level")]
    pub level: Option<String>,
    /// Values at or below this become missing; `null` disables masking.
    #[serde(default = "default_mask_threshold")]
    pub mask_threshold: Option<f32>,
    /// Reject payloads whose GRIB2 parameter is not `variable`.
    #[serde(default = "default_verify_parameter")]
    pub verify_parameter: bool,
}

fn default_variable() -> String {
    "REFC".to_string()
}

fn default_level() -> Option<String> {
    Some("entire atmosphere".to_string())
}

fn default_mask_threshold() -> Option<f32> {
    Some(grib2_parser::DEFAULT_MASK_THRESHOLD)
}

fn default_verify_parameter() -> bool {
    true
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            variable: default_variable(),
            level: default_level(),
            mask_threshold: default_mask_threshold(),
            verify_parameter: default_verify_parameter(),
        }
    }
}

impl FieldConfig {
    pub fn selector(&self) -> FieldSelector {
        let selector = FieldSelector::new(self.variable.clone());
        match &self.level {
            Some(level) => selector.at_level(level.clone()),
            None => selector,
        }
    }
}

/// Which run to fetch and how many hours of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Hours subtracted from the reference time to pick a published run.
    #[serde(default = "default_offset_hours")]
    pub offset_hours: u32,
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: u32,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_offset_hours() -> u32 {
    3
}

fn default_horizon_hours() -> u32 {
    48
}

fn default_max_concurrent() -> usize {
    1
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            offset_hours: default_offset_hours(),
            horizon_hours: default_horizon_hours(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Frame layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    /// Full map extent; the decoded field's own bounds when unset.
    #[serde(default)]
    pub full_extent: Option<BoundingBox>,
    #[serde(default = "default_inset_extent")]
    pub inset_extent: BoundingBox,
    #[serde(default = "default_highlight_point")]
    pub highlight_point: GeoPoint,
    #[serde(default = "default_inset_scale")]
    pub inset_scale: f64,
}

fn default_width() -> usize {
    800
}

fn default_height() -> usize {
    600
}

fn default_inset_extent() -> BoundingBox {
    BoundingBox::new(-92.0, 30.0, -80.0, 37.0)
}

fn default_highlight_point() -> GeoPoint {
    GeoPoint::new(-86.5861, 34.7304)
}

fn default_inset_scale() -> f64 {
    0.275
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            full_extent: None,
            inset_extent: default_inset_extent(),
            highlight_point: default_highlight_point(),
            inset_scale: default_inset_scale(),
        }
    }
}

/// Animated loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Display time of each frame.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u32,
    /// Number of plays; 0 loops forever.
    #[serde(default)]
    pub loop_count: u16,
    #[serde(default = "default_animation_file")]
    pub file_name: String,
}

fn default_delay_ms() -> u32 {
    1000
}

fn default_animation_file() -> String {
    "radar_loop.gif".to_string()
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            loop_count: 0,
            file_name: default_animation_file(),
        }
    }
}

/// HTTP client behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Check the archive root is reachable before walking the horizon.
    #[serde(default = "default_preflight")]
    pub preflight: bool,
}

fn default_request_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_preflight() -> bool {
    true
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            preflight: default_preflight(),
        }
    }
}

impl RunConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self, FatalError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FatalError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content)
            .map_err(|e| FatalError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join(".staging"))
    }

    /// Reject values that would make every hour fail.
    pub fn validate(&self) -> Result<(), FatalError> {
        let invalid = |msg: String| Err(FatalError::Config(msg));

        if self.source.root_url.trim().is_empty() {
            return invalid("source.root_url is empty".to_string());
        }
        if !self.source.file_template.contains("{forecast:02}") {
            return invalid("source.file_template must contain {forecast:02}".to_string());
        }
        if self.field.variable.trim().is_empty() {
            return invalid("field.variable is empty".to_string());
        }
        if self.schedule.horizon_hours == 0 {
            return invalid("schedule.horizon_hours must be at least 1".to_string());
        }
        if self.schedule.max_concurrent == 0 {
            return invalid("schedule.max_concurrent must be at least 1".to_string());
        }
        if let Err(e) = frame_style(&self.render).layout() {
            return invalid(format!("render: {}", e));
        }
        if !(self.render.inset_scale > 0.0 && self.render.inset_scale <= 1.0) {
            return invalid(format!(
                "render.inset_scale {} must be in (0, 1]",
                self.render.inset_scale
            ));
        }
        if let Some(extent) = &self.render.full_extent {
            extent
                .validate()
                .map_err(|e| FatalError::Config(format!("render.full_extent: {}", e)))?;
        }
        self.render
            .inset_extent
            .validate()
            .map_err(|e| FatalError::Config(format!("render.inset_extent: {}", e)))?;
        if self.animation.file_name.trim().is_empty() {
            return invalid("animation.file_name is empty".to_string());
        }
        if let Some(staging) = &self.staging_dir {
            if absolute(&self.output_dir).starts_with(absolute(staging)) {
                return invalid(format!(
                    "staging_dir {} must not be or contain output_dir {}",
                    staging.display(),
                    self.output_dir.display()
                ));
            }
        }

        Ok(())
    }
}

/// Lexically absolute form of `path`, for containment checks on
/// directories that may not exist yet.
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
