//! Band-by-band orchestration of detection, correction and outputs.
//!
//! Bands are processed strictly in order, one column cache at a time. Within
//! a band the forward and backward scans run in parallel and are joined before
//! consensus. A stop request is honoured at the next column boundary; bands
//! finished before it are still committed.

mod outputs;

use std::fmt;
use std::path::{Path, PathBuf};

pub use outputs::{Artifact, ArtifactFailure};

use outputs::OutputSet;

use crate::column_cache::ColumnCache;
use crate::config::{ColumnRange, Config};
use crate::consensus::{self, Decision, VerifiedFault};
use crate::corrector;
use crate::error::{Error, Result};
use crate::progress::{EventCallback, Phase, PipelineEvent, PipelineState, ProgressTracker};
use crate::raster::{RasterBand, RasterHeader, RasterReader};
use crate::report::{self, BandReport};
use crate::scanner::{DirectionalScanner, FaultCandidate, ScanDirection};
use crate::stop::{StopToken, Stopped};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Stopped before `band` finished.
    Stopped { band: usize },
}

/// A faulty column together with its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FaultLocation {
    pub band: usize,
    pub column: usize,
}

impl fmt::Display for FaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (band {})", self.column, self.band)
    }
}

/// What a run did.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Faults of every completed band, detected or loaded.
    pub report: BandReport,
    pub bands_completed: usize,
    /// Output files that were committed.
    pub written: Vec<PathBuf>,
    pub failures: Vec<ArtifactFailure>,
}

impl RunSummary {
    pub fn faulty_columns(&self) -> Vec<FaultLocation> {
        self.report
            .iter()
            .flat_map(|(band, faults)| {
                faults
                    .iter()
                    .map(move |fault| FaultLocation {
                        band,
                        column: fault.column,
                    })
            })
            .collect()
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.outcome, RunOutcome::Stopped { .. })
    }
}

/// Runs the destriping pipeline for one [`Config`].
#[derive(Debug)]
pub struct Destriper {
    config: Config,
    events: EventCallback,
    stop: StopToken,
}

impl Destriper {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events: EventCallback::default(),
            stop: StopToken::new(),
        }
    }

    pub fn with_events(mut self, events: EventCallback) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops this run at the next column boundary.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Processes every band of the input raster.
    ///
    /// Input errors are returned before any output is created, or abort the
    /// run discarding unfinished outputs. Output failures end up in
    /// [`RunSummary::failures`].
    pub fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;

        let mut reader = RasterReader::open(&self.config.input)?;
        let header = reader.header();
        let range = ColumnRange::resolve(self.config.column_range, header.cols)?;
        self.log(format!("{} bands detected", header.band_count));
        tracing::info!(
            input = %self.config.input.display(),
            rows = header.rows,
            cols = header.cols,
            bands = header.band_count,
            "Starting run"
        );

        let loaded = match &self.config.reuse_report {
            Some(path) => Some(self.load_report(path, header)?),
            None => None,
        };

        let tracker = ProgressTracker::new(header.band_count, self.events.clone());
        let mut outputs = OutputSet::create(&self.config, header);
        let mut report = BandReport::new();

        for band in 0..header.band_count {
            if self.stop.is_requested() {
                return Ok(self.stopped(band, outputs, report));
            }

            self.set_state(PipelineState::Scanning { band });
            self.events.emit(&PipelineEvent::BandStarted { band });
            self.log(format!("Scanning band {}", band));
            tracker.start_band();

            let original = reader.read_band(band)?;

            let faults = match &loaded {
                Some(loaded) => {
                    for phase in [Phase::ForwardScan, Phase::BackwardScan, Phase::Consensus] {
                        tracker.complete(phase);
                    }
                    loaded.get(band).map(<[_]>::to_vec).unwrap_or_default()
                }
                None => match self.detect(&original, range, &tracker) {
                    Ok(faults) => faults,
                    Err(Stopped) => return Ok(self.stopped(band, outputs, report)),
                },
            };
            self.log_faults(band, &faults);

            let corrected = if self.config.tasks.needs_correction() {
                self.set_state(PipelineState::Correcting { band });
                Some(corrector::apply(&original, &faults))
            } else {
                None
            };

            self.set_state(PipelineState::WritingOutputs { band });
            outputs.write_band(band, &original, corrected.as_ref());
            tracker.complete(Phase::Outputs);

            self.events.emit(&PipelineEvent::BandFinished {
                band,
                faults: faults.len(),
            });
            report.insert(band, faults);
            tracker.finish_band();
        }

        let summary = self.finish(RunOutcome::Completed, outputs, report);
        tracker.finish();
        self.set_state(PipelineState::Done);
        self.log("Process finished");
        Ok(summary)
    }

    /// Scans one band in both directions and resolves the candidates.
    fn detect(
        &self,
        band: &RasterBand,
        range: ColumnRange,
        tracker: &ProgressTracker,
    ) -> std::result::Result<Vec<VerifiedFault>, Stopped> {
        let cache = ColumnCache::build(band);
        let thresholds = self.config.thresholds;

        let run_scan = |direction: ScanDirection, phase: Phase| {
            DirectionalScanner::new(&cache, range, direction, thresholds)
                .scan(&self.stop, |done, total| tracker.update(phase, done, total))
        };
        let (forward, backward) = rayon::join(
            || run_scan(ScanDirection::Forward, Phase::ForwardScan),
            || run_scan(ScanDirection::Backward, Phase::BackwardScan),
        );
        let (forward, backward) = (forward?, backward?);

        self.log_candidates(ScanDirection::Forward, &forward);
        self.log_candidates(ScanDirection::Backward, &backward);

        let faults = consensus::resolve_with(&forward, &backward, &cache, |done, total, decision| {
            tracker.update(Phase::Consensus, done, total);
            match decision {
                Some(Decision::Faulty(column)) => self.log(format!("Column {} marked as faulty", column)),
                Some(Decision::Correct(column)) => self.log(format!("Column {} marked as correct", column)),
                None => {}
            }
        });
        tracker.complete(Phase::Consensus);

        Ok(faults)
    }

    /// Loads a previous report and checks it fits the raster.
    fn load_report(&self, path: &Path, header: RasterHeader) -> Result<BandReport> {
        let parsed = report::read_report(path)?;
        for error in &parsed.errors {
            self.warn(format!("Skipped {}", error));
        }

        for (band, faults) in parsed.report.iter() {
            if band >= header.band_count {
                return Err(Error::ReportMismatch {
                    band,
                    reason: format!("raster has {} bands", header.band_count),
                });
            }
            if let Some(fault) = faults.iter().find(|f| f.column >= header.cols) {
                return Err(Error::ReportMismatch {
                    band,
                    reason: format!(
                        "column {} is outside a raster {} columns wide",
                        fault.column, header.cols
                    ),
                });
            }
        }

        for band in (0..header.band_count).filter(|&b| !parsed.report.contains_band(b)) {
            self.warn(format!("Band {} has no entry in the report, assuming no faults", band));
        }

        self.log(format!("Values loaded from file: {}", path.display()));
        Ok(parsed.report)
    }

    fn stopped(&self, band: usize, outputs: OutputSet, report: BandReport) -> RunSummary {
        tracing::info!(band, "Run stopped");
        let summary = self.finish(RunOutcome::Stopped { band }, outputs, report);
        self.set_state(PipelineState::Stopped { band });
        self.log(format!("Process stopped at band {}", band));
        summary
    }

    fn finish(&self, outcome: RunOutcome, outputs: OutputSet, report: BandReport) -> RunSummary {
        let (written, failures) = outputs.finish(&report);

        if let Some(path) = self.config.outputs.report.as_ref() {
            if written.contains(path) {
                self.log(format!("Values saved to file: {}", path.display()));
            }
        }
        for failure in &failures {
            self.warn(format!("Output failed: {}", failure));
        }

        RunSummary {
            outcome,
            bands_completed: report.band_count(),
            report,
            written,
            failures,
        }
    }

    fn log_candidates(&self, direction: ScanDirection, candidates: &[FaultCandidate]) {
        let name = match direction {
            ScanDirection::Forward => "Forward",
            ScanDirection::Backward => "Backward",
        };
        for candidate in candidates {
            self.log(format!(
                "{} scanner: potential bad column at {} (gain={}, bias={})",
                name, candidate.column, candidate.regression.gain, candidate.regression.bias
            ));
        }
    }

    fn log_faults(&self, band: usize, faults: &[VerifiedFault]) {
        if faults.is_empty() {
            self.log(format!("Band {}: no faulty columns found", band));
            return;
        }
        let columns = faults
            .iter()
            .map(|f| f.column.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.log(format!(
            "Band {}: {} faulty columns found at column {}",
            band,
            faults.len(),
            columns
        ));
    }

    fn set_state(&self, state: PipelineState) {
        tracing::debug!(%state, "State changed");
        self.events.emit(&PipelineEvent::StateChanged(state));
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.events.emit(&PipelineEvent::Log(message));
    }

    fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.events.emit(&PipelineEvent::Log(message));
    }
}
