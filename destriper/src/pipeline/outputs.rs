//! Output artifacts of a run.
//!
//! Raster artifacts collect one page per finished band in temporary files and
//! are committed together at the end. A failing artifact is recorded and
//! dropped, which discards its temporary file, while the others carry on.

use std::path::PathBuf;

use strum_macros::Display;

use crate::config::Config;
use crate::error::Error;
use crate::mask;
use crate::raster::{RasterBand, RasterHeader, RasterWriter};
use crate::report::{self, BandReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Artifact {
    #[strum(to_string = "report")]
    Report,
    #[strum(to_string = "corrected raster")]
    CorrectedRaster,
    #[strum(to_string = "check mask")]
    CheckMask,
}

/// An output that couldn't be produced. Other outputs of the run are unaffected.
#[derive(Debug)]
pub struct ArtifactFailure {
    pub artifact: Artifact,
    /// Band being written when the failure happened, if any.
    pub band: Option<usize>,
    pub error: Error,
}

impl std::fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.band {
            Some(band) => write!(f, "{} (band {}): {}", self.artifact, band, self.error),
            None => write!(f, "{}: {}", self.artifact, self.error),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Off,
    Open(RasterWriter),
    Failed,
}

impl Slot {
    fn open(
        artifact: Artifact,
        path: Option<&PathBuf>,
        header: RasterHeader,
        failures: &mut Vec<ArtifactFailure>,
    ) -> Self {
        let Some(path) = path else {
            return Slot::Off;
        };
        match RasterWriter::create(path, header.rows, header.cols) {
            Ok(writer) => Slot::Open(writer),
            Err(error) => {
                tracing::error!(%artifact, "{}", error);
                failures.push(ArtifactFailure {
                    artifact,
                    band: None,
                    error,
                });
                Slot::Failed
            }
        }
    }

    fn write(
        &mut self,
        artifact: Artifact,
        band: usize,
        data: &RasterBand,
        failures: &mut Vec<ArtifactFailure>,
    ) {
        let Slot::Open(writer) = self else {
            return;
        };
        if let Err(error) = writer.write_band(band, data) {
            tracing::error!(%artifact, band, "{}", error);
            failures.push(ArtifactFailure {
                artifact,
                band: Some(band),
                error,
            });
            *self = Slot::Failed;
        }
    }

    fn wants_data(&self) -> bool {
        matches!(self, Slot::Open(_))
    }
}

/// Requested artifacts of one run.
#[derive(Debug)]
pub(super) struct OutputSet {
    report: Option<PathBuf>,
    corrected: Slot,
    mask: Slot,
    failures: Vec<ArtifactFailure>,
}

impl OutputSet {
    /// Opens a temporary writer for every requested raster artifact.
    pub fn create(config: &Config, header: RasterHeader) -> Self {
        let tasks = config.tasks;
        let mut failures = Vec::new();

        let corrected = if tasks.produce_corrected_raster {
            Slot::open(
                Artifact::CorrectedRaster,
                config.outputs.corrected_raster.as_ref(),
                header,
                &mut failures,
            )
        } else {
            Slot::Off
        };
        let mask = if tasks.produce_check_mask {
            Slot::open(
                Artifact::CheckMask,
                config.outputs.check_mask.as_ref(),
                header,
                &mut failures,
            )
        } else {
            Slot::Off
        };
        let report = config
            .outputs
            .report
            .clone()
            .filter(|_| tasks.export_report);

        Self {
            report,
            corrected,
            mask,
            failures,
        }
    }

    /// Appends one finished band to the raster artifacts.
    pub fn write_band(&mut self, band: usize, original: &RasterBand, corrected: Option<&RasterBand>) {
        let Some(corrected) = corrected else {
            return;
        };

        self.corrected
            .write(Artifact::CorrectedRaster, band, corrected, &mut self.failures);

        if self.mask.wants_data() {
            let mask = mask::build(original, corrected);
            self.mask
                .write(Artifact::CheckMask, band, &mask, &mut self.failures);
        }
    }

    /// Commits every artifact holding at least one band and writes the report
    /// when `report` covers at least one band.
    ///
    /// Returns the paths written and the failures of the whole run.
    pub fn finish(self, report: &BandReport) -> (Vec<PathBuf>, Vec<ArtifactFailure>) {
        let Self {
            report: report_path,
            corrected,
            mask,
            mut failures,
        } = self;
        let mut written = Vec::new();

        for (artifact, slot) in [
            (Artifact::CorrectedRaster, corrected),
            (Artifact::CheckMask, mask),
        ] {
            let Slot::Open(writer) = slot else {
                continue;
            };
            if writer.bands_written() == 0 {
                continue;
            }
            match writer.commit() {
                Ok(path) => {
                    tracing::info!(%artifact, path = %path.display(), "Output committed");
                    written.push(path);
                }
                Err(error) => {
                    tracing::error!(%artifact, "{}", error);
                    failures.push(ArtifactFailure {
                        artifact,
                        band: None,
                        error,
                    });
                }
            }
        }

        if let Some(path) = report_path.filter(|_| !report.is_empty()) {
            match report::write_report(&path, report) {
                Ok(()) => written.push(path),
                Err(error) => {
                    tracing::error!(artifact = %Artifact::Report, "{}", error);
                    failures.push(ArtifactFailure {
                        artifact: Artifact::Report,
                        band: None,
                        error,
                    });
                }
            }
        }

        (written, failures)
    }
}
