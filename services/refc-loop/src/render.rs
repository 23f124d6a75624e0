//! Frame rendering boundary.

use std::path::PathBuf;

pub use renderer::FrameRequest;
use renderer::{FrameRenderer, FrameStyle};

use crate::config::RenderConfig;

/// Turns one decoded field into an image file keyed by forecast hour.
pub trait Renderer: Send + Sync {
    fn render(&self, request: &FrameRequest<'_>) -> anyhow::Result<PathBuf>;
}

impl Renderer for FrameRenderer {
    fn render(&self, request: &FrameRequest<'_>) -> anyhow::Result<PathBuf> {
        Ok(FrameRenderer::render(self, request)?)
    }
}

pub fn frame_style(config: &RenderConfig) -> FrameStyle {
    FrameStyle {
        width: config.width,
        height: config.height,
        inset_scale: config.inset_scale,
    }
}

/// Frame renderer writing into `output_dir` with the configured layout.
pub fn frame_renderer(config: &RenderConfig, output_dir: impl Into<PathBuf>) -> FrameRenderer {
    FrameRenderer::new(output_dir, frame_style(config))
}
