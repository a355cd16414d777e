//! JSON output types for machine-readable CLI output.
//!
//! Every command accepts `--json`. The output always carries `success` and
//! `errors`; the run report is attached when the command got far enough to
//! produce one.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::report::{SyncReport, UnwrapReport};

/// Error codes for CLI-level failures.
///
/// Catalog errors pass through their own codes (`E001`..`E005`), blob
/// failures use the diagnostic codes (`E101`..`E105`).
pub mod error_codes {
    /// Config file could not be read or parsed
    pub const CONFIG: &str = "CLI_001";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g., "CLI_001", "E001")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// File the error refers to (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl JsonError {
    /// Creates a new error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            file: None,
        }
    }

    /// Sets the file path for this error.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl From<&CatalogError> for JsonError {
    fn from(err: &CatalogError) -> Self {
        JsonError::new(err.code(), err.to_string())
    }
}

/// JSON output for the `sync` command.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    /// Whether every record made it through every stage
    pub success: bool,
    /// Fatal errors that aborted the batch
    pub errors: Vec<JsonError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
}

impl SyncOutput {
    pub fn from_report(report: SyncReport) -> Self {
        Self {
            success: report.success(),
            errors: Vec::new(),
            report: Some(report),
        }
    }

    pub fn failure(errors: Vec<JsonError>) -> Self {
        Self {
            success: false,
            errors,
            report: None,
        }
    }
}

/// JSON output for the `unwrap` command.
#[derive(Debug, Clone, Serialize)]
pub struct UnwrapOutput {
    pub success: bool,
    pub errors: Vec<JsonError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<UnwrapReport>,
}

impl UnwrapOutput {
    pub fn from_report(report: UnwrapReport) -> Self {
        Self {
            success: report.success(),
            errors: Vec::new(),
            report: Some(report),
        }
    }

    pub fn failure(errors: Vec<JsonError>) -> Self {
        Self {
            success: false,
            errors,
            report: None,
        }
    }
}

/// JSON output for `read-volume` and `patch-volume`.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeOutput {
    pub success: bool,
    pub errors: Vec<JsonError>,
    pub blob: String,
    pub gzip: bool,
    /// Volume stored in the blob after the command ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    /// Volume before a patch, when the blob was rewritten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<f32>,
    /// Whether the blob was rewritten
    pub patched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_output_omits_report() {
        let err = CatalogError::SongsDirMissing("/missing".into());
        let output = SyncOutput::failure(vec![JsonError::from(&err)]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["code"], "E002");
        assert!(json.get("report").is_none());
        assert!(json["errors"][0].get("file").is_none());
    }

    #[test]
    fn test_report_output_carries_success() {
        let output = SyncOutput::from_report(SyncReport::new("/library", false));
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["report"]["songs_dir"], "/library");
    }
}
