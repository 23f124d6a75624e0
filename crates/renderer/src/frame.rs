//! One animation frame: full map, colour bar and an inset detail panel.

use std::path::{Path, PathBuf};

use chrono::Timelike;
use radar_common::{BoundingBox, DecodedField, GeoPoint};
use tracing::debug;

use crate::colormap::{Color, ReflectivityScale};
use crate::png::create_png_auto;
use crate::raster::{Canvas, Rect, Viewport};

const PAGE: Color = Color::rgb(255, 255, 255);
const MAP_BACKGROUND: Color = Color::rgb(232, 232, 226);
const OUTLINE: Color = Color::rgb(0, 0, 0);
const HIGHLIGHT: Color = Color::rgb(220, 20, 60);

/// Everything needed to draw one forecast hour.
#[derive(Debug, Clone)]
pub struct FrameRequest<'a> {
    pub field: &'a DecodedField,
    pub forecast_hour: u32,
    pub highlight: GeoPoint,
    /// Full map extent; the field's own bounds when `None`.
    pub full_extent: Option<BoundingBox>,
    pub inset_extent: BoundingBox,
}

/// Canvas size and inset placement.
#[derive(Debug, Clone)]
pub struct FrameStyle {
    pub width: usize,
    pub height: usize,
    /// Inset size as a fraction of the map area.
    pub inset_scale: f64,
}

/// Smallest map panel, in pixels, left after margins and the colour bar.
const MIN_MAP_SIZE: usize = 4;

/// Placement of the map panel and colour bar for a [`FrameStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub margin: usize,
    pub bar_height: usize,
    pub map_area: Rect,
}

impl FrameStyle {
    /// Fails with [`RenderError::InvalidSize`] when the canvas cannot hold the
    /// margins, the colour bar and a map panel.
    pub fn layout(&self) -> Result<FrameLayout, RenderError> {
        let (width, height) = (self.width, self.height);
        if width < 16 || height < 16 {
            return Err(RenderError::InvalidSize { width, height });
        }

        // Map on top, colour bar along the bottom
        let margin = (width / 50).max(2);
        let bar_height = (height / 25).max(4);
        let map_width = width.checked_sub(2 * margin);
        let map_height = height.checked_sub(3 * margin + bar_height);

        match (map_width, map_height) {
            (Some(w), Some(h)) if w >= MIN_MAP_SIZE && h >= MIN_MAP_SIZE => Ok(FrameLayout {
                margin,
                bar_height,
                map_area: Rect::new(margin, margin, w, h),
            }),
            _ => Err(RenderError::InvalidSize { width, height }),
        }
    }
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            inset_scale: 0.275,
        }
    }
}

/// File name of the frame for a forecast hour, e.g. `hrrr_refl_07f.png`.
pub fn frame_file_name(forecast_hour: u32) -> String {
    format!("hrrr_refl_{:02}f.png", forecast_hour)
}

/// Renders reflectivity frames into a directory.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    output_dir: PathBuf,
    style: FrameStyle,
    scale: ReflectivityScale,
}

impl FrameRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, style: FrameStyle) -> Self {
        Self {
            output_dir: output_dir.into(),
            style,
            scale: ReflectivityScale::default(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render and write the frame, returning its path.
    pub fn render(&self, request: &FrameRequest<'_>) -> Result<PathBuf, RenderError> {
        let png = self.render_png(request)?;
        let path = self.output_dir.join(frame_file_name(request.forecast_hour));
        std::fs::write(&path, &png)?;
        debug!(path = %path.display(), bytes = png.len(), "Wrote frame");
        Ok(path)
    }

    /// Render to encoded PNG bytes.
    pub fn render_png(&self, request: &FrameRequest<'_>) -> Result<Vec<u8>, RenderError> {
        let canvas = self.draw(request)?;

        let valid = request.field.valid_time.format("%Y-%m-%d %H:%M UTC").to_string();
        let run = format!("{:02}Z HRRR", request.field.analysis_time.hour());
        let hour = format!("{:02}", request.forecast_hour);
        let title = format!("Valid: {}, {}\nForecast Hour {}", valid, run, hour);

        create_png_auto(
            canvas.pixels(),
            canvas.width(),
            canvas.height(),
            &[
                ("Title", title.as_str()),
                ("Valid", valid.as_str()),
                ("Run", run.as_str()),
                ("ForecastHour", hour.as_str()),
                ("Description", "Composite Reflectivity (dBZ)"),
            ],
        )
        .map_err(RenderError::Encode)
    }

    /// Draw the frame into a canvas.
    pub fn draw(&self, request: &FrameRequest<'_>) -> Result<Canvas, RenderError> {
        let FrameLayout {
            margin,
            bar_height,
            map_area,
        } = self.style.layout()?;
        let FrameStyle {
            width,
            height,
            inset_scale,
        } = self.style;

        let full_extent = match request.full_extent {
            Some(extent) => extent,
            None => request.field.bounds().ok_or(RenderError::EmptyExtent)?,
        };
        validate_extent(&full_extent)?;
        validate_extent(&request.inset_extent)?;

        let mut canvas = Canvas::new(width, height, PAGE);

        let map_rect = map_area.fit_extent(&full_extent);
        let map = Viewport::new(full_extent, map_rect);

        canvas.fill_rect(map_rect, MAP_BACKGROUND);
        canvas.draw_field(request.field, &map, &self.scale);
        canvas.stroke_rect(map_rect, 1, OUTLINE);

        self.draw_color_bar(
            &mut canvas,
            Rect::new(margin, height - margin - bar_height, width - 2 * margin, bar_height),
        );

        // Inset in the lower-left corner of the map
        let inset_box = Rect::new(
            0,
            0,
            ((map_rect.width as f64 * inset_scale) as usize).max(8),
            ((map_rect.height as f64 * inset_scale) as usize).max(8),
        );
        let inset_size = inset_box.fit_extent(&request.inset_extent);
        let inset_rect = Rect::new(
            map_rect.x + margin,
            (map_rect.y + map_rect.height).saturating_sub(margin + inset_size.height),
            inset_size.width,
            inset_size.height,
        );
        let inset = Viewport::new(request.inset_extent, inset_rect);

        canvas.fill_rect(inset_rect, MAP_BACKGROUND);
        canvas.draw_field(request.field, &inset, &self.scale);
        if let Some((x, y)) = inset.to_pixel(request.highlight.lon, request.highlight.lat) {
            let radius = (inset_rect.width as f64 / 30.0).max(4.0);
            canvas.draw_star(x, y, radius, HIGHLIGHT);
        }
        canvas.stroke_rect(inset_rect, 2, OUTLINE);

        Ok(canvas)
    }

    fn draw_color_bar(&self, canvas: &mut Canvas, rect: Rect) {
        let colors = self.scale.band_colors();
        let band_width = rect.width / colors.len().max(1);
        for (i, color) in colors.iter().enumerate() {
            canvas.fill_rect(
                Rect::new(rect.x + i * band_width, rect.y, band_width, rect.height),
                *color,
            );
        }
        canvas.stroke_rect(
            Rect::new(rect.x, rect.y, band_width * colors.len(), rect.height),
            1,
            OUTLINE,
        );
    }
}

fn validate_extent(extent: &BoundingBox) -> Result<(), RenderError> {
    extent
        .validate()
        .map_err(|_| RenderError::InvalidExtent(*extent))
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Field has no finite coordinates to derive an extent from")]
    EmptyExtent,

    #[error("Invalid map extent: {0:?}")]
    InvalidExtent(BoundingBox),

    #[error("Invalid frame size {width}x{height}")]
    InvalidSize { width: usize, height: usize },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
