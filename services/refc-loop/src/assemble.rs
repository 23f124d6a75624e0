//! Loop assembly boundary and the GIF implementation.

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use tracing::info;

use crate::config::AnimationConfig;

/// Result of handing the frames to an assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOutcome {
    Written(PathBuf),
    /// No frames were given, nothing was written.
    Empty,
}

/// Combines ordered frames into one animated artifact.
pub trait LoopAssembler: Send + Sync {
    /// `frames` is already in playback order.
    fn assemble(&self, frames: &[PathBuf], config: &AnimationConfig)
        -> anyhow::Result<AssemblyOutcome>;
}

/// Animated GIF written next to the frames.
#[derive(Debug, Clone)]
pub struct GifAssembler {
    output_dir: PathBuf,
}

impl GifAssembler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl LoopAssembler for GifAssembler {
    fn assemble(
        &self,
        frames: &[PathBuf],
        config: &AnimationConfig,
    ) -> anyhow::Result<AssemblyOutcome> {
        if frames.is_empty() {
            return Ok(AssemblyOutcome::Empty);
        }

        let repeat = match config.loop_count {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        };
        let delay = Delay::from_numer_denom_ms(config.delay_ms, 1);

        // Encode in memory; the trailer is only written when the encoder drops
        let mut gif = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut gif, 20);
            encoder.set_repeat(repeat)?;
            for frame_path in frames {
                let image = image::open(frame_path)
                    .with_context(|| format!("Failed to read frame {}", frame_path.display()))?
                    .to_rgba8();
                encoder
                    .encode_frame(Frame::from_parts(image, 0, 0, delay))
                    .with_context(|| format!("Failed to encode frame {}", frame_path.display()))?;
            }
        }

        let path = self.output_dir.join(&config.file_name);
        std::fs::write(&path, &gif)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(
            path = %path.display(),
            frames = frames.len(),
            bytes = gif.len(),
            delay_ms = config.delay_ms,
            loop_count = config.loop_count,
            "Wrote animated loop"
        );
        Ok(AssemblyOutcome::Written(path))
    }
}
