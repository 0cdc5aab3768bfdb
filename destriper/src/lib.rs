//! Destriper - column stripe detection and correction for push-broom rasters.
//!
//! A detector column whose gain or offset drifts from its neighbours shows up
//! as a vertical stripe. For every band this crate:
//! - transposes the band into a column cache
//! - fits each column against its neighbour, scanning left to right and right
//!   to left in parallel
//! - keeps the columns both scans agree on and that a correction would
//!   actually change
//! - writes a corrected raster, a check mask and a text report on request
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use destriper::{Config, Destriper, TaskSelection};
//!
//! let mut config = Config::new("scene.tif");
//! config.tasks = TaskSelection::all();
//! config.outputs.report = Some("faults.txt".into());
//! config.outputs.corrected_raster = Some("corrected.tif".into());
//! config.outputs.check_mask = Some("mask.tif".into());
//!
//! let summary = Destriper::new(config).run()?;
//! for location in summary.faulty_columns() {
//!     println!("faulty column {location}");
//! }
//! ```

pub mod column_cache;
pub mod config;
pub mod consensus;
pub mod corrector;
mod error;
pub mod mask;
mod pipeline;
pub mod progress;
pub mod raster;
pub mod regression;
pub mod report;
pub mod scanner;
mod stop;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{
    Artifact, ArtifactFailure, Destriper, FaultLocation, RunOutcome, RunSummary,
};
pub use progress::{EventCallback, PipelineEvent, PipelineState, Progress};
pub use stop::{StopToken, Stopped};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{ColumnRange, Config, OutputPaths, QualityThresholds, TaskSelection};

// ============================================================================
// Detection results
// ============================================================================

pub use consensus::VerifiedFault;
pub use regression::Regression;
pub use report::{BandReport, ParsedReport, ReportParseError};
pub use scanner::{FaultCandidate, ScanDirection};

// ============================================================================
// Raster data and errors
// ============================================================================

pub use error::{Error, Result};
pub use raster::{RasterBand, RasterHeader, RasterReader, RasterWriter};
