//! Catalog-wide blob stages: volume patching and gzip unwrapping.

use std::path::Path;

use songbook_blob::{
    blob_files, patch_volume, preview_patch, preview_unwrap, song_blob_path, unwrap_file,
    BlobError, RewrapOutcome, Wrapping,
};
use songbook_schema::{fields, Descriptor, DiagnosticCode, FieldValue, Schema};

use crate::catalog::Catalog;
use crate::report::{PatchRecord, RecordFailure, Stage, UnwrapRecord};
use crate::writers::write_descriptor;

fn is_gzipped(descriptor: &Descriptor) -> bool {
    descriptor
        .get(fields::GZIPPED)
        .and_then(FieldValue::as_bool)
        .unwrap_or(false)
}

fn volume_of(descriptor: &Descriptor) -> f64 {
    descriptor
        .get(fields::VOLUME)
        .and_then(FieldValue::as_float)
        .unwrap_or(0.0)
}

/// Results of the patch stage.
#[derive(Debug, Default)]
pub struct PatchStage {
    pub records: Vec<PatchRecord>,
    pub failures: Vec<RecordFailure>,
}

/// Writes each record's `volume` into its song blob.
///
/// Records with a volume of `0.0` are skipped. The blob wrapping follows the
/// record's `areFilesGZipped` flag. Dry runs read the current value and
/// report the outcome without writing.
pub fn patch_catalog(catalog: &Catalog, dry_run: bool) -> PatchStage {
    let mut stage = PatchStage::default();

    for (id, descriptor) in catalog.iter() {
        let volume = volume_of(descriptor);
        if volume == 0.0 {
            continue;
        }
        let Some(dir) = descriptor.dir() else {
            stage.failures.push(RecordFailure::new(
                DiagnosticCode::MissingBlob,
                id,
                Stage::Patch,
                "record has no song directory",
            ));
            continue;
        };

        let blob = song_blob_path(dir, id);
        let wrapping = Wrapping::from_flag(is_gzipped(descriptor));
        let target = volume as f32;
        let result = if dry_run {
            preview_patch(&blob, wrapping, target)
        } else {
            patch_volume(&blob, wrapping, target)
        };

        match result {
            Ok(outcome) => stage.records.push(PatchRecord {
                id: id.to_string(),
                blob,
                outcome,
                dry_run,
            }),
            Err(e) => stage
                .failures
                .push(RecordFailure::new(e.code(), id, Stage::Patch, e.to_string())),
        }
    }

    stage
}

/// Results of the unwrap stage.
#[derive(Debug, Default)]
pub struct UnwrapStage {
    pub records: Vec<UnwrapRecord>,
    /// Ids whose descriptor flag was cleared
    pub cleared: Vec<String>,
    pub failures: Vec<RecordFailure>,
}

/// Decompresses the blobs of every record flagged `areFilesGZipped`.
///
/// A record's flag is cleared and its descriptor rewritten only when all of
/// its blobs are raw afterwards. Raw blobs of flagged records are left alone,
/// so an interrupted run can simply be repeated.
pub fn unwrap_catalog(schema: &Schema, catalog: &mut Catalog, dry_run: bool) -> UnwrapStage {
    let flagged: Vec<String> = catalog
        .iter()
        .filter(|(_, d)| is_gzipped(d))
        .map(|(id, _)| id.to_string())
        .collect();

    let mut stage = UnwrapStage::default();
    for id in flagged {
        let Some(descriptor) = catalog.get_mut(&id) else {
            continue;
        };
        match unwrap_record(schema, &id, descriptor, dry_run) {
            Ok(records) => {
                stage.records.extend(records);
                stage.cleared.push(id);
            }
            Err(failure) => stage.failures.push(failure),
        }
    }
    stage
}

fn unwrap_record(
    schema: &Schema,
    id: &str,
    descriptor: &mut Descriptor,
    dry_run: bool,
) -> Result<Vec<UnwrapRecord>, RecordFailure> {
    let fail = |code: DiagnosticCode, message: String| RecordFailure::new(code, id, Stage::Unwrap, message);

    let dir = descriptor
        .dir()
        .map(Path::to_path_buf)
        .ok_or_else(|| fail(DiagnosticCode::MissingBlob, "record has no song directory".to_string()))?;
    let blobs = blob_files(&dir, id).map_err(|e| fail(DiagnosticCode::UnwrapFailed, e.to_string()))?;
    if blobs.is_empty() {
        return Err(fail(
            DiagnosticCode::MissingBlob,
            format!("no blobs found in {}", dir.display()),
        ));
    }

    let mut records = Vec::new();
    for blob in blobs {
        let result = if dry_run {
            preview_unwrap(&blob)
        } else {
            unwrap_file(&blob)
        };
        let outcome = result.map_err(|e| {
            let code = match e {
                BlobError::Missing(_) => DiagnosticCode::MissingBlob,
                _ => DiagnosticCode::UnwrapFailed,
            };
            fail(code, format!("{}: {}", blob.display(), e))
        })?;
        if outcome != RewrapOutcome::AlreadyDone {
            records.push(UnwrapRecord {
                id: id.to_string(),
                blob,
                outcome,
            });
        }
    }

    if !dry_run {
        descriptor.set(fields::GZIPPED, false);
        write_descriptor(schema, descriptor).map_err(|e| fail(DiagnosticCode::UnwrapFailed, e.to_string()))?;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::normalize;
    use songbook_blob::{gzip, read_volume, MIN_BLOB_LEN, VOLUME_OFFSET};
    use std::path::PathBuf;

    fn blob_bytes() -> Vec<u8> {
        let mut data = vec![0x5a; 600];
        data[VOLUME_OFFSET..MIN_BLOB_LEN].copy_from_slice(&0.0f32.to_be_bytes());
        data
    }

    fn song(root: &Path, id: &str, volume: f64, gzipped: bool) -> (String, Descriptor) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        let bytes = if gzipped { gzip(&blob_bytes()).unwrap() } else { blob_bytes() };
        std::fs::write(song_blob_path(&dir, id), &bytes).unwrap();

        let mut d = Descriptor::with_id(id);
        d.set(fields::VOLUME, volume);
        d.set(fields::GZIPPED, gzipped);
        d.set_path(dir.join("data.json"));
        (id.to_string(), normalize(Schema::standard(), &d).0)
    }

    fn blob(root: &Path, id: &str) -> PathBuf {
        song_blob_path(&root.join(id), id)
    }

    #[test]
    fn test_patch_skips_zero_volume_and_follows_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Catalog = [
            song(tmp.path(), "raw", 1.25, false),
            song(tmp.path(), "packed", 0.5, true),
            song(tmp.path(), "silent", 0.0, false),
        ]
        .into_iter()
        .collect();

        let stage = patch_catalog(&catalog, false);
        assert!(stage.failures.is_empty());
        assert_eq!(stage.records.len(), 2);
        assert_eq!(read_volume(&blob(tmp.path(), "raw"), Wrapping::Raw).unwrap(), 1.25);
        assert_eq!(read_volume(&blob(tmp.path(), "packed"), Wrapping::Gzip).unwrap(), 0.5);
        assert_eq!(std::fs::read(blob(tmp.path(), "silent")).unwrap(), blob_bytes());
    }

    #[test]
    fn test_patch_dry_run_and_missing_blob() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog: Catalog = [song(tmp.path(), "abc", 1.25, false)].into_iter().collect();

        let stage = patch_catalog(&catalog, true);
        assert!(stage.records[0].outcome.is_patched());
        assert_eq!(std::fs::read(blob(tmp.path(), "abc")).unwrap(), blob_bytes());

        std::fs::remove_file(blob(tmp.path(), "abc")).unwrap();
        catalog.get_mut("abc").unwrap().set(fields::VOLUME, 2.0);
        let stage = patch_catalog(&catalog, false);
        assert_eq!(stage.failures[0].code, DiagnosticCode::MissingBlob);
    }

    #[test]
    fn test_unwrap_clears_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let (id, descriptor) = song(tmp.path(), "abc", 0.0, true);
        let dir = tmp.path().join("abc");
        std::fs::write(dir.join("abc_m.bin"), gzip(b"chart").unwrap()).unwrap();
        let mut catalog: Catalog = [(id, descriptor)].into_iter().collect();

        let stage = unwrap_catalog(Schema::standard(), &mut catalog, false);
        assert!(stage.failures.is_empty());
        assert_eq!(stage.cleared, vec!["abc"]);
        assert_eq!(stage.records.len(), 2);
        assert_eq!(std::fs::read(dir.join("abc_m.bin")).unwrap(), b"chart");
        assert_eq!(std::fs::read(blob(tmp.path(), "abc")).unwrap(), blob_bytes());

        let written = std::fs::read_to_string(dir.join("data.json")).unwrap();
        assert!(written.contains("\"areFilesGZipped\": false"));
    }

    #[test]
    fn test_unwrap_dry_run_keeps_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog: Catalog = [song(tmp.path(), "abc", 0.0, true)].into_iter().collect();

        let stage = unwrap_catalog(Schema::standard(), &mut catalog, true);
        assert_eq!(stage.records.len(), 1);
        assert!(songbook_blob::is_gzip(&std::fs::read(blob(tmp.path(), "abc")).unwrap()));
        assert!(!tmp.path().join("abc/data.json").exists());
    }

    #[test]
    fn test_unwrap_corrupt_blob_keeps_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog: Catalog = [song(tmp.path(), "abc", 0.0, true)].into_iter().collect();
        let mut corrupt = gzip(&blob_bytes()).unwrap();
        corrupt.truncate(20);
        std::fs::write(blob(tmp.path(), "abc"), corrupt).unwrap();

        let stage = unwrap_catalog(Schema::standard(), &mut catalog, false);
        assert_eq!(stage.failures[0].code, DiagnosticCode::UnwrapFailed);
        assert!(is_gzipped(catalog.get("abc").unwrap()));
    }
}
