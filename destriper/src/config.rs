//! Run configuration.
//!
//! A [`Config`] carries everything one pipeline run needs: the input raster,
//! detection thresholds, an optional column window, which outputs to produce
//! and where to put them. It can be loaded from YAML or JSON settings files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Acceptable deviation of a neighbour-pair regression from the identity line.
///
/// A pair is consistent when `|gain - 1| <= gain_threshold` and
/// `|bias| <= bias_threshold`. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub gain_threshold: f64,
    pub bias_threshold: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            gain_threshold: 0.1,
            bias_threshold: 3.0,
        }
    }
}

impl QualityThresholds {
    pub fn new(gain_threshold: f64, bias_threshold: f64) -> Self {
        Self {
            gain_threshold,
            bias_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("gain_threshold", self.gain_threshold),
            ("bias_threshold", self.bias_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Which artifacts a run materializes. Detection runs regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSelection {
    pub export_report: bool,
    pub produce_corrected_raster: bool,
    pub produce_check_mask: bool,
}

impl TaskSelection {
    pub fn all() -> Self {
        Self {
            export_report: true,
            produce_corrected_raster: true,
            produce_check_mask: true,
        }
    }

    /// The corrected band is needed in memory for the raster and for the mask.
    pub fn needs_correction(&self) -> bool {
        self.produce_corrected_raster || self.produce_check_mask
    }
}

/// Half-open column window `[start, end)` to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn full(cols: usize) -> Self {
        Self { start: 0, end: cols }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, column: usize) -> bool {
        (self.start..self.end).contains(&column)
    }

    /// Number of adjacent pairs each directional scan compares.
    #[inline]
    pub fn pair_count(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Resolves an optional window against a raster `cols` wide.
    pub fn resolve(range: Option<ColumnRange>, cols: usize) -> Result<ColumnRange> {
        let range = range.unwrap_or(ColumnRange::full(cols));
        if range.start >= range.end || range.end > cols {
            return Err(Error::InvalidConfig(format!(
                "column range {}..{} is not within a raster {} columns wide",
                range.start, range.end, cols
            )));
        }
        Ok(range)
    }
}

/// Destination paths of the artifacts selected in [`TaskSelection`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub report: Option<PathBuf>,
    pub corrected_raster: Option<PathBuf>,
    pub check_mask: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Multi-band raster to inspect.
    pub input: PathBuf,
    pub thresholds: QualityThresholds,
    /// Columns to scan. `None` scans the whole band.
    pub column_range: Option<ColumnRange>,
    pub tasks: TaskSelection,
    pub outputs: OutputPaths,
    /// Previously written report to reuse instead of scanning.
    pub reuse_report: Option<PathBuf>,
}

impl Config {
    pub fn new<P: Into<PathBuf>>(input: P) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Loads a YAML or JSON settings file, chosen by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        common::file_format::load_file(path).map_err(|source| Error::LoadConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        common::file_format::save_file(self, path).map_err(|source| Error::SaveConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks the settings that don't depend on the raster itself.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("no input raster given".to_string()));
        }

        self.thresholds.validate()?;

        if let Some(range) = self.column_range {
            if range.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "column range {}..{} is empty",
                    range.start, range.end
                )));
            }
        }

        let missing = [
            (
                self.tasks.export_report,
                self.outputs.report.is_none(),
                "report",
            ),
            (
                self.tasks.produce_corrected_raster,
                self.outputs.corrected_raster.is_none(),
                "corrected raster",
            ),
            (
                self.tasks.produce_check_mask,
                self.outputs.check_mask.is_none(),
                "check mask",
            ),
        ];
        for (requested, path_missing, name) in missing {
            if requested && path_missing {
                return Err(Error::InvalidConfig(format!(
                    "{} requested without an output path",
                    name
                )));
            }
        }

        Ok(())
    }
}
