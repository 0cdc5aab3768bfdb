//! Error types for destriping runs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring or running the pipeline.
///
/// Input errors abort the run before any output is created. Output errors are
/// tied to one artifact and are collected into the run summary instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration '{path}': {source}")]
    LoadConfig {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to save configuration '{path}': {source}")]
    SaveConfig {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to open raster '{path}': {source}")]
    OpenRaster {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode raster '{path}'{}: {source}", band_suffix(*band))]
    DecodeRaster {
        path: PathBuf,
        band: Option<usize>,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Unsupported raster '{path}': {reason}")]
    UnsupportedRaster { path: PathBuf, reason: String },

    #[error("Failed to read report '{path}': {source}")]
    ReadReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Report does not match raster at band {band}: {reason}")]
    ReportMismatch { band: usize, reason: String },

    #[error("Failed to create output '{path}': {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode band {band} into '{path}': {source}")]
    EncodeRaster {
        path: PathBuf,
        band: usize,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Failed to write report '{path}': {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move finished output to '{path}': {source}")]
    PersistOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn band_suffix(band: Option<usize>) -> String {
    band.map(|b| format!(" at band {b}")).unwrap_or_default()
}

impl Error {
    /// True for errors caused by the inputs of a run. These are fatal.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::LoadConfig { .. }
                | Error::OpenRaster { .. }
                | Error::DecodeRaster { .. }
                | Error::UnsupportedRaster { .. }
                | Error::ReadReport { .. }
                | Error::ReportMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_raster_error_message() {
        let err = Error::OpenRaster {
            path: PathBuf::from("/data/scene.tif"),
            source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
        };
        assert!(err.to_string().contains("/data/scene.tif"));
        assert!(err.to_string().contains("file not found"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_decode_error_mentions_band() {
        let err = Error::DecodeRaster {
            path: PathBuf::from("scene.tif"),
            band: Some(2),
            source: tiff::TiffError::LimitsExceeded,
        };
        assert!(err.to_string().contains("at band 2"));

        let err = Error::DecodeRaster {
            path: PathBuf::from("scene.tif"),
            band: None,
            source: tiff::TiffError::LimitsExceeded,
        };
        assert!(!err.to_string().contains("at band"));
    }

    #[test]
    fn test_report_mismatch_message() {
        let err = Error::ReportMismatch {
            band: 4,
            reason: "raster has 3 bands".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("band 4"));
        assert!(msg.contains("raster has 3 bands"));
    }

    #[test]
    fn test_output_errors_are_not_input_errors() {
        let err = Error::WriteReport {
            path: PathBuf::from("/tmp/report.txt"),
            source: io::Error::other("disk full"),
        };
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as StdError;

        let err = Error::CreateOutput {
            path: PathBuf::from("/test"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }
}
