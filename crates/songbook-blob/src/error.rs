//! Error types for blob operations.

use std::path::PathBuf;

use songbook_schema::DiagnosticCode;
use thiserror::Error;

/// Error type for blob reads, patches and gzip maintenance.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The blob file does not exist.
    #[error("blob not found: {}", .0.display())]
    Missing(PathBuf),

    /// The (decompressed) blob ends before the volume window.
    #[error("blob is {len} bytes, at least {required} are required")]
    TooShort { len: usize, required: usize },

    /// The descriptor declares gzip but the data lacks the gzip magic.
    #[error("blob is flagged as gzip-wrapped but has no gzip header")]
    NotGzip,

    /// Gzip stream could not be decoded.
    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// Read-back after writing did not hold the target value.
    #[error("verification failed: expected {expected}, found {found}")]
    VerificationFailed { expected: f32, found: f32 },

    /// IO error on the blob or its temporary sibling.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            BlobError::Missing(path)
        } else {
            BlobError::Io { path, source }
        }
    }

    /// Diagnostic code reported when a patch fails with this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            BlobError::Missing(_) => DiagnosticCode::MissingBlob,
            BlobError::VerificationFailed { .. } => DiagnosticCode::VerificationFailed,
            BlobError::TooShort { .. }
            | BlobError::NotGzip
            | BlobError::Decompress(_)
            | BlobError::Io { .. } => DiagnosticCode::PatchFailed,
        }
    }
}
