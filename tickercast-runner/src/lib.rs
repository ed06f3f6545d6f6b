//! TickerCast Runner — pipeline orchestration on top of the core crate.
//!
//! Sequences catalog → fetch → training frame → forecast for a single
//! user request, with cache/download/synthetic fallback for history
//! loading and artifact export for the results.

pub mod config;
pub mod export;
pub mod loader;
pub mod pipeline;

pub use config::{ConfigError, HorizonBounds, RunConfig};
pub use export::{save_artifacts, ExportError, RunManifest};
pub use loader::{load_history, LoadError, LoadOptions, LoadedHistory};
pub use pipeline::{run_pipeline, PipelineError, PipelineReport, PipelineRequest};
