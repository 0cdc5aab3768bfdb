//! Plain-text fault report.
//!
//! One line per band, in ascending band order:
//!
//! ```text
//! Band0:\t[column=20,gain=1.5,bias=200]\t[column=31,gain=0.92,bias=-4.5]\t
//! Band1:\t
//! ```
//!
//! Every fault triplet is followed by a tab. A band without faults still gets
//! its line. Numbers are written in their shortest round-tripping form.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::consensus::VerifiedFault;
use crate::error::{Error, Result};

/// Verified faults of every band, keyed by band index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandReport {
    bands: BTreeMap<usize, Vec<VerifiedFault>>,
}

impl BandReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the faults of `band`, replacing any previous entry.
    pub fn insert(&mut self, band: usize, faults: Vec<VerifiedFault>) {
        self.bands.insert(band, faults);
    }

    pub fn get(&self, band: usize) -> Option<&[VerifiedFault]> {
        self.bands.get(&band).map(Vec::as_slice)
    }

    pub fn contains_band(&self, band: usize) -> bool {
        self.bands.contains_key(&band)
    }

    /// Bands in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[VerifiedFault])> {
        self.bands.iter().map(|(&band, faults)| (band, faults.as_slice()))
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn fault_count(&self) -> usize {
        self.bands.values().map(Vec::len).sum()
    }
}

/// A report line that couldn't be parsed. The line is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("report line {line}: {reason}")]
pub struct ReportParseError {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Result of parsing a report: the bands that parsed and the lines that didn't.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReport {
    pub report: BandReport,
    pub errors: Vec<ReportParseError>,
}

pub fn format_report(report: &BandReport) -> String {
    let mut out = String::new();
    for (band, faults) in report.iter() {
        // writing to a String can't fail
        let _ = write!(out, "Band{}:\t", band);
        for fault in faults {
            let _ = write!(
                out,
                "[column={},gain={},bias={}]\t",
                fault.column, fault.gain, fault.bias
            );
        }
        out.push('\n');
    }
    out
}

/// Writes the report atomically: a temporary file next to `path` is renamed
/// onto it once fully written.
pub fn write_report(path: &Path, report: &BandReport) -> Result<()> {
    let write_err = |source| Error::WriteReport {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(format_report(report).as_bytes())
        .map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| Error::PersistOutput {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    tracing::debug!(path = %path.display(), bands = report.band_count(), "Report written");
    Ok(())
}

/// Parses report text, collecting malformed lines instead of failing.
///
/// Blank lines are ignored. A band appearing twice keeps its first line.
pub fn parse_report(text: &str) -> ParsedReport {
    let mut parsed = ParsedReport::default();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok((band, _)) if parsed.report.contains_band(band) => {
                parsed.errors.push(ReportParseError {
                    line: line_no,
                    reason: format!("band {} listed twice", band),
                });
            }
            Ok((band, faults)) => parsed.report.insert(band, faults),
            Err(reason) => parsed.errors.push(ReportParseError {
                line: line_no,
                reason,
            }),
        }
    }

    parsed
}

/// Reads and parses the report at `path`. Only I/O failures are errors.
pub fn read_report(path: &Path) -> Result<ParsedReport> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ReadReport {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_report(&text);

    for error in &parsed.errors {
        tracing::warn!(path = %path.display(), "{}", error);
    }
    tracing::debug!(
        path = %path.display(),
        bands = parsed.report.band_count(),
        faults = parsed.report.fault_count(),
        "Report read"
    );

    Ok(parsed)
}

fn parse_line(line: &str) -> std::result::Result<(usize, Vec<VerifiedFault>), String> {
    let (label, rest) = line
        .split_once(':')
        .ok_or_else(|| "missing ':' after band label".to_string())?;

    let band = label
        .trim()
        .strip_prefix("Band")
        .and_then(|n| n.parse::<usize>().ok())
        .ok_or_else(|| format!("invalid band label '{}'", label.trim()))?;

    let faults = rest
        .split('\t')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_fault)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((band, faults))
}

fn parse_fault(token: &str) -> std::result::Result<VerifiedFault, String> {
    let body = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| format!("fault '{}' is not bracketed", token))?;

    let mut fields = body.split(',');
    let column = next_field(&mut fields, "column").ok_or_else(|| lacks(token, "column"))?;
    let gain = next_field(&mut fields, "gain").ok_or_else(|| lacks(token, "gain"))?;
    let bias = next_field(&mut fields, "bias").ok_or_else(|| lacks(token, "bias"))?;
    if fields.next().is_some() {
        return Err(format!("fault '{}' has extra fields", token));
    }

    let column = column
        .parse::<usize>()
        .map_err(|e| format!("bad column '{}': {}", column, e))?;
    let gain = gain
        .parse::<f64>()
        .map_err(|e| format!("bad gain '{}': {}", gain, e))?;
    let bias = bias
        .parse::<f64>()
        .map_err(|e| format!("bad bias '{}': {}", bias, e))?;

    Ok(VerifiedFault::new(column, gain, bias))
}

/// Takes the next `name=value` field, returning the value.
fn next_field<'a>(fields: &mut impl Iterator<Item = &'a str>, name: &str) -> Option<&'a str> {
    fields.next()?.trim().strip_prefix(name)?.strip_prefix('=')
}

fn lacks(token: &str, name: &str) -> String {
    format!("fault '{}' lacks '{}'", token, name)
}
