//! Structured results of catalog runs.
//!
//! The library never prints. Commands render these types either as colored
//! console text or as JSON.

use std::path::PathBuf;

use serde::Serialize;
use songbook_blob::{PatchOutcome, RewrapOutcome};
use songbook_schema::{Diagnostic, DiagnosticCode};

/// A change of a record's position in the ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub id: String,
    pub title: String,
    /// Previous rank, `None` when the record had none
    pub old: Option<i64>,
    pub new: i64,
}

/// A completed (or, in dry runs, planned) id rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameRecord {
    pub old_id: String,
    pub new_id: String,
    /// Directory after the rename
    pub dir: PathBuf,
    pub files_renamed: usize,
    pub manifests_rewritten: usize,
    pub dry_run: bool,
}

/// Result of patching one song's volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchRecord {
    pub id: String,
    pub blob: PathBuf,
    #[serde(flatten)]
    pub outcome: PatchOutcome,
    pub dry_run: bool,
}

/// Result of decompressing one blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnwrapRecord {
    pub id: String,
    pub blob: PathBuf,
    #[serde(flatten)]
    pub outcome: RewrapOutcome,
}

/// A record excluded from one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub code: DiagnosticCode,
    pub id: String,
    pub stage: Stage,
    pub message: String,
}

impl RecordFailure {
    pub fn new(code: DiagnosticCode, id: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            code,
            id: id.into(),
            stage,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{}] {} failed: {}", self.code, self.id, self.stage, self.message)
    }
}

/// Pipeline stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rename,
    Patch,
    Unwrap,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Rename => "rename",
            Stage::Patch => "patch",
            Stage::Unwrap => "unwrap",
            Stage::Write => "write",
        })
    }
}

/// Outcome of a `sync` run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: String,
    pub songs_dir: PathBuf,
    /// Where the remote copy came from (spreadsheet or tabular export)
    pub remote_source: Option<PathBuf>,
    pub dry_run: bool,
    pub on_disk: usize,
    pub remote: usize,
    pub imported: Vec<String>,
    pub replaced: usize,
    pub remote_only: Vec<String>,
    pub rank_changes: Vec<RankChange>,
    pub renames: Vec<RenameRecord>,
    pub patches: Vec<PatchRecord>,
    pub failures: Vec<RecordFailure>,
    pub diagnostics: Vec<Diagnostic>,
    pub descriptors_written: usize,
    pub table_written: Option<PathBuf>,
    pub sheet_published: Option<PathBuf>,
}

impl SyncReport {
    pub fn new(songs_dir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            songs_dir: songs_dir.into(),
            remote_source: None,
            dry_run,
            on_disk: 0,
            remote: 0,
            imported: Vec::new(),
            replaced: 0,
            remote_only: Vec::new(),
            rank_changes: Vec::new(),
            renames: Vec::new(),
            patches: Vec::new(),
            failures: Vec::new(),
            diagnostics: Vec::new(),
            descriptors_written: 0,
            table_written: None,
            sheet_published: None,
        }
    }

    /// Whether every record made it through every stage.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of patches that actually changed a blob.
    pub fn patched_count(&self) -> usize {
        self.patches.iter().filter(|p| p.outcome.is_patched()).count()
    }
}

/// Outcome of an `unwrap` run.
#[derive(Debug, Clone, Serialize)]
pub struct UnwrapReport {
    pub started_at: String,
    pub songs_dir: PathBuf,
    pub dry_run: bool,
    pub unwrapped: Vec<UnwrapRecord>,
    pub descriptors_updated: Vec<String>,
    pub failures: Vec<RecordFailure>,
    pub diagnostics: Vec<Diagnostic>,
    /// Tabular export rewritten with the cleared flags
    pub table_written: Option<PathBuf>,
    pub sheet_published: Option<PathBuf>,
}

impl UnwrapReport {
    pub fn new(songs_dir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            songs_dir: songs_dir.into(),
            dry_run,
            unwrapped: Vec::new(),
            descriptors_updated: Vec::new(),
            failures: Vec::new(),
            diagnostics: Vec::new(),
            table_written: None,
            sheet_published: None,
        }
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_record_serializes_flat() {
        let record = PatchRecord {
            id: "abc".to_string(),
            blob: PathBuf::from("abc/song_abc.bin"),
            outcome: PatchOutcome::Patched {
                previous: 0.0,
                volume: 1.25,
            },
            dry_run: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "patched");
        assert_eq!(json["volume"], 1.25);
        assert_eq!(json["id"], "abc");
    }

    #[test]
    fn test_failure_display() {
        let failure = RecordFailure::new(
            DiagnosticCode::VerificationFailed,
            "abc",
            Stage::Patch,
            "expected 1.25, found 0",
        );
        assert_eq!(failure.to_string(), "E102: [abc] patch failed: expected 1.25, found 0");
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = SyncReport::new("/library", true);
        assert!(report.success());
        assert_eq!(report.patched_count(), 0);
        assert!(!report.started_at.is_empty());
    }
}
