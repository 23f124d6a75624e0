//! HRRR composite reflectivity loop.
//!
//! Resolves the byte range of one field from each forecast hour's `.idx`
//! inventory, fetches only that range, decodes it, renders a frame and
//! assembles the frames into an animated loop. The modules are public so
//! the pipeline can be driven against fake archives in tests.

pub mod assemble;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod fetch;
pub mod render;
pub mod staging;
pub mod summary;
pub mod walker;

pub use assemble::{AssemblyOutcome, GifAssembler, LoopAssembler};
pub use config::RunConfig;
pub use error::{FatalError, HourError, Stage};
pub use fetch::{ArchiveSource, FetchError, HttpArchive};
pub use render::Renderer;
pub use summary::{HourOutcome, HourStatus, RunStatus, RunSummary};
pub use walker::{plan_targets, reference_run, ForecastWalker};
