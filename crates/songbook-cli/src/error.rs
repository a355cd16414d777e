//! Error types for catalog processing.

use std::path::PathBuf;

use songbook_schema::{DiagnosticCode, SchemaError};
use thiserror::Error;

/// Fatal errors: the batch aborts before any writer runs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A record or table header disagrees with the registry.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaError),

    /// The songs directory does not exist.
    #[error("songs directory not found: {}", .0.display())]
    SongsDirMissing(PathBuf),

    /// A tabular or spreadsheet source could not be read.
    #[error("failed to read table {}: {message}", path.display())]
    TableRead { path: PathBuf, message: String },

    /// A tabular or spreadsheet destination could not be written.
    #[error("failed to write table {}: {message}", path.display())]
    TableWrite { path: PathBuf, message: String },

    /// A descriptor could not be serialized or written.
    #[error("failed to write descriptor {}: {message}", path.display())]
    DescriptorWrite { path: PathBuf, message: String },

    /// Two records headed for the same table row.
    #[error("song id '{0}' appears twice in the output table")]
    DuplicateId(String),
}

impl CatalogError {
    /// Returns the stable error code (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::SchemaMismatch(_) => "E001",
            CatalogError::SongsDirMissing(_) => "E002",
            CatalogError::TableRead { .. } => "E003",
            CatalogError::TableWrite { .. } => "E004",
            CatalogError::DescriptorWrite { .. } => "E005",
            CatalogError::DuplicateId(_) => "E006",
        }
    }

    pub(crate) fn table_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        CatalogError::TableRead {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn table_write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        CatalogError::TableWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Errors reading or rewriting a conversion manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid UTF-16LE text.
    #[error("{} is not UTF-16LE text", .0.display())]
    Encoding(PathBuf),

    #[error("invalid manifest JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ManifestError {
    pub fn code(&self) -> DiagnosticCode {
        DiagnosticCode::RenameFailed
    }
}

/// Errors planning or applying an id rename.
#[derive(Debug, Error)]
pub enum RenameError {
    /// The new id is already used by another record, on disk or remotely.
    #[error("id '{0}' is already in use")]
    IdCollision(String),

    /// The record has no directory on disk.
    #[error("song directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),

    /// A rename target already exists.
    #[error("rename target already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A filesystem step failed; completed steps were rolled back.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A step failed and some completed steps could not be undone. The
    /// leftover paths stay in their renamed or rewritten state.
    #[error("{source}; rollback failed, left in place: {}", join_paths(leftovers))]
    RollbackFailed {
        #[source]
        source: Box<RenameError>,
        leftovers: Vec<PathBuf>,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl RenameError {
    pub fn code(&self) -> DiagnosticCode {
        DiagnosticCode::RenameFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_codes() {
        let err = CatalogError::from(SchemaError::UnknownColumn("songName_jpText".to_string()));
        assert_eq!(err.code(), "E001");
        assert_eq!(
            err.to_string(),
            "schema mismatch: unknown column 'songName_jpText' in table header"
        );
        assert_eq!(CatalogError::table_read("a.csv", "boom").code(), "E003");
    }

    #[test]
    fn test_rename_errors_map_to_rename_failed() {
        assert_eq!(
            RenameError::IdCollision("xyz".to_string()).code(),
            DiagnosticCode::RenameFailed
        );
        assert_eq!(
            ManifestError::Encoding(PathBuf::from("conversion.json")).code(),
            DiagnosticCode::RenameFailed
        );
    }
}
