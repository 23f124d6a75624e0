//! Image rendering for composite reflectivity frames.
//!
//! - Banded reflectivity colour ramp
//! - Plate-carrée rasterisation of decoded grids onto an RGBA canvas
//! - PNG encoding with `tEXt` metadata
//! - Frame layout: full map, colour bar, inset with a highlighted point

pub mod colormap;
pub mod frame;
pub mod png;
pub mod raster;

pub use colormap::{Color, ReflectivityScale};
pub use frame::{frame_file_name, FrameLayout, FrameRenderer, FrameRequest, FrameStyle, RenderError};
