//! Scan pipeline components.
//!
//! ## Submodules
//!
//! - [`config`] - CLI arguments and validated run configuration.
//! - [`pool`] - Worker pool orchestration and the per-worker loop.
//! - [`streaming`] - Chunk planning, retrying fetches, and chunk processing.
//! - [`output`] - Per-chunk record sinks.
//! - [`candidates`] - Post-processing of scan output.
//! - [`telemetry`] - Logging and optional OpenTelemetry export.

pub mod candidates;
pub mod config;
pub mod error;
pub mod output;
pub mod pool;
pub mod streaming;
pub mod telemetry;
