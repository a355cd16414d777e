//! Error and diagnostic types for schema processing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic codes emitted while normalizing catalog records.
///
/// `W` codes are recoverable per record: the value is defaulted or normalized
/// and processing continues. `E` codes isolate a single record from the stage
/// that failed while the rest of the batch carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// W001: Schema field absent, zero value inserted
    MissingField,
    /// W002: Descriptor file empty or unparseable
    UnreadableDescriptor,
    /// W003: Value converted to its schema type
    CoercedValue,
    /// W004: Value could not be converted, zero value inserted
    InvalidValue,
    /// W005: Record present remotely but missing on disk
    MissingOnDisk,
    /// W006: Derived field disagreed with its sources and was recomputed
    DerivedFieldUpdated,
    /// W007: Two descriptors on disk share a song id
    DuplicateSongId,
    /// W008: Song blob found without a descriptor next to it
    MissingDescriptor,

    /// E101: Volume patch failed
    PatchFailed,
    /// E102: Volume patch read-back did not match
    VerificationFailed,
    /// E103: Rename cascade failed and was rolled back
    RenameFailed,
    /// E104: Expected blob file is missing
    MissingBlob,
    /// E105: Gzip unwrap failed
    UnwrapFailed,
    /// E106: Descriptor could not be written
    WriteFailed,
}

impl DiagnosticCode {
    /// Returns the code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticCode::MissingField => "W001",
            DiagnosticCode::UnreadableDescriptor => "W002",
            DiagnosticCode::CoercedValue => "W003",
            DiagnosticCode::InvalidValue => "W004",
            DiagnosticCode::MissingOnDisk => "W005",
            DiagnosticCode::DerivedFieldUpdated => "W006",
            DiagnosticCode::DuplicateSongId => "W007",
            DiagnosticCode::MissingDescriptor => "W008",
            DiagnosticCode::PatchFailed => "E101",
            DiagnosticCode::VerificationFailed => "E102",
            DiagnosticCode::RenameFailed => "E103",
            DiagnosticCode::MissingBlob => "E104",
            DiagnosticCode::UnwrapFailed => "E105",
            DiagnosticCode::WriteFailed => "E106",
        }
    }

    /// Whether this code isolates the record from the failing stage.
    pub fn is_failure(&self) -> bool {
        self.code().starts_with('E')
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A diagnostic tied to a song and, optionally, one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// Song id of the affected record.
    pub song_id: String,
    /// Flat field key, when the issue concerns a single field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a record-level diagnostic.
    pub fn new(code: DiagnosticCode, song_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            song_id: song_id.into(),
            field: None,
            message: message.into(),
        }
    }

    /// Creates a diagnostic naming a specific field.
    pub fn with_field(
        code: DiagnosticCode,
        song_id: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            song_id: song_id.into(),
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "{}: [{}] {} (field '{}')",
                self.code, self.song_id, self.message, field
            ),
            None => write!(f, "{}: [{}] {}", self.code, self.song_id, self.message),
        }
    }
}

/// Structural errors: the registry and the data no longer agree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A field name appears twice in the registry.
    #[error("duplicate schema field '{0}'")]
    DuplicateField(String),

    /// A field name nests deeper than one level or has an empty part.
    #[error("schema field '{0}' must be 'name' or 'outer_inner'")]
    InvalidFieldName(String),

    /// A record's key set does not match the registry.
    #[error(
        "record '{id}' does not match the schema (missing: [{}], unexpected: [{}])",
        missing.join(", "),
        unexpected.join(", ")
    )]
    FieldMismatch {
        id: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A table header names a column the registry does not know.
    #[error("unknown column '{0}' in table header")]
    UnknownColumn(String),
}

/// Errors produced while parsing a descriptor body.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The file had no content besides whitespace.
    #[error("descriptor is empty")]
    Empty,

    /// JSON syntax error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level value was not an object.
    #[error("descriptor root must be a JSON object")]
    NotAnObject,

    /// A group contained another object or an array.
    #[error("key '{0}' nests deeper than one level")]
    TooDeep(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_partitioned() {
        assert!(!DiagnosticCode::MissingField.is_failure());
        assert!(!DiagnosticCode::MissingDescriptor.is_failure());
        assert!(DiagnosticCode::VerificationFailed.is_failure());
        assert!(DiagnosticCode::RenameFailed.is_failure());
    }

    #[test]
    fn test_diagnostic_display_names_field() {
        let diag = Diagnostic::with_field(
            DiagnosticCode::MissingField,
            "abc",
            "starUra",
            "field missing, defaulted",
        );
        assert_eq!(
            diag.to_string(),
            "W001: [abc] field missing, defaulted (field 'starUra')"
        );
    }

    #[test]
    fn test_field_mismatch_message() {
        let err = SchemaError::FieldMismatch {
            id: "abc".to_string(),
            missing: vec!["order".to_string()],
            unexpected: vec!["songName_jpText".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "record 'abc' does not match the schema (missing: [order], unexpected: [songName_jpText])"
        );
    }
}
