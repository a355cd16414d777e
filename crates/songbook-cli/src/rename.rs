//! Song id rename cascade.
//!
//! A record whose `id-new` is set to a different id is renamed together
//! with everything on disk that embeds the old id: files inside the song
//! directory, the directory itself, and conversion manifest references to
//! that directory.
//!
//! All steps are planned and checked before anything is touched. They then
//! run in a fixed order (file renames, manifest rewrites, directory rename);
//! when a step fails, the completed ones are undone in reverse order and the
//! record is left as it was.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use songbook_schema::{fields, Descriptor, FieldValue};
use walkdir::WalkDir;

use crate::catalog::Catalog;
use crate::config::CatalogConfig;
use crate::error::RenameError;
use crate::manifest::Manifest;
use crate::report::{RecordFailure, RenameRecord, Stage};

/// Replaces every occurrence of `old` in `name` that is bounded on both sides
/// by the start or end of the name, `_` or `.`.
///
/// Returns `None` when nothing was replaced.
pub fn substitute_token(name: &str, old: &str, new: &str) -> Option<String> {
    if old.is_empty() {
        return None;
    }
    let is_boundary = |c: Option<char>| matches!(c, None | Some('_') | Some('.'));

    let mut out = String::with_capacity(name.len());
    let mut last = 0;
    for (pos, _) in name.match_indices(old) {
        let end = pos + old.len();
        if pos < last
            || !is_boundary(name[..pos].chars().next_back())
            || !is_boundary(name[end..].chars().next())
        {
            continue;
        }
        out.push_str(&name[last..pos]);
        out.push_str(new);
        last = end;
    }

    if last == 0 {
        return None;
    }
    out.push_str(&name[last..]);
    Some(out)
}

/// A checked rename, ready to run.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub old_id: String,
    pub new_id: String,
    pub old_dir: PathBuf,
    pub new_dir: PathBuf,
    /// File renames inside `old_dir`
    pub files: Vec<(PathBuf, PathBuf)>,
    manifests: Vec<ManifestRewrite>,
}

#[derive(Debug, Clone)]
struct ManifestRewrite {
    rewritten: Manifest,
    original: Vec<u8>,
}

impl RenamePlan {
    pub fn manifest_count(&self) -> usize {
        self.manifests.len()
    }

    pub fn renames_dir(&self) -> bool {
        self.old_dir != self.new_dir
    }
}

/// Plans the rename of `old_id` to `new_id` for the song directory `dir`.
///
/// Fails when the directory is missing, any rename target already exists,
/// or a manifest that must be rewritten cannot be decoded.
pub fn plan_rename(
    dir: &Path,
    old_id: &str,
    new_id: &str,
    manifest_file: &str,
) -> Result<RenamePlan, RenameError> {
    if !dir.is_dir() {
        return Err(RenameError::DirectoryMissing(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(renamed) = substitute_token(name, old_id, new_id) else {
            continue;
        };
        let target = entry.path().with_file_name(renamed);
        if target.exists() {
            return Err(RenameError::TargetExists(target));
        }
        files.push((entry.path().to_path_buf(), target));
    }

    let dir_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let new_dir = match substitute_token(&dir_name, old_id, new_id) {
        Some(renamed) => {
            let target = dir.with_file_name(renamed);
            if target.exists() {
                return Err(RenameError::TargetExists(target));
            }
            target
        }
        None => dir.to_path_buf(),
    };

    let mut manifests = Vec::new();
    if new_dir != dir {
        let new_name = new_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let mut candidates = vec![dir.join(manifest_file)];
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join(manifest_file));
        }
        for path in candidates.into_iter().filter(|p| p.is_file()) {
            let mut manifest = Manifest::read(&path)?;
            if manifest.rewrite_dir(&dir_name, new_name) == 0 {
                continue;
            }
            let original = std::fs::read(&path).map_err(|source| RenameError::Io {
                path: path.clone(),
                source,
            })?;
            manifests.push(ManifestRewrite {
                rewritten: manifest,
                original,
            });
        }
    }

    Ok(RenamePlan {
        old_id: old_id.to_string(),
        new_id: new_id.to_string(),
        old_dir: dir.to_path_buf(),
        new_dir,
        files,
        manifests,
    })
}

/// A completed filesystem step, kept for rollback.
enum Step {
    Renamed { from: PathBuf, to: PathBuf },
    Rewrote { path: PathBuf, original: Vec<u8> },
}

/// Runs a plan. On failure every completed step is undone.
pub fn apply_rename(plan: &RenamePlan) -> Result<(), RenameError> {
    let mut done = Vec::new();
    run_steps(plan, &mut done).map_err(|e| undo(e, done))
}

/// Undoes the completed steps and returns the error to report for `error`.
fn undo(error: RenameError, done: Vec<Step>) -> RenameError {
    let leftovers = roll_back(done);
    if leftovers.is_empty() {
        return error;
    }
    RenameError::RollbackFailed {
        source: Box::new(error),
        leftovers,
    }
}

fn run_steps(plan: &RenamePlan, done: &mut Vec<Step>) -> Result<(), RenameError> {
    for (from, to) in &plan.files {
        rename_path(from, to)?;
        done.push(Step::Renamed {
            from: from.clone(),
            to: to.clone(),
        });
    }

    for rewrite in &plan.manifests {
        rewrite.rewritten.write()?;
        done.push(Step::Rewrote {
            path: rewrite.rewritten.path().to_path_buf(),
            original: rewrite.original.clone(),
        });
    }

    if plan.renames_dir() {
        rename_path(&plan.old_dir, &plan.new_dir)?;
        done.push(Step::Renamed {
            from: plan.old_dir.clone(),
            to: plan.new_dir.clone(),
        });
    }

    Ok(())
}

/// Undoes steps in reverse order. Returns the paths that could not be restored.
fn roll_back(done: Vec<Step>) -> Vec<PathBuf> {
    let mut leftovers = Vec::new();
    for step in done.into_iter().rev() {
        match step {
            Step::Renamed { from, to } => {
                if std::fs::rename(&to, &from).is_err() {
                    leftovers.push(to);
                }
            }
            Step::Rewrote { path, original } => {
                if songbook_blob::replace_file(&path, &original).is_err() {
                    leftovers.push(path);
                }
            }
        }
    }
    leftovers
}

fn rename_path(from: &Path, to: &Path) -> Result<(), RenameError> {
    std::fs::rename(from, to).map_err(|source| RenameError::Io {
        path: from.to_path_buf(),
        source,
    })
}

/// Results of the rename stage.
#[derive(Debug, Default)]
pub struct RenameOutcome {
    pub records: Vec<RenameRecord>,
    pub failures: Vec<RecordFailure>,
}

/// Renames every record with a pending `id-new`, in ascending id order.
///
/// Successful renames move the catalog entry to the new id, substitute the
/// id in `songFileName`, clear `id-new` and update the descriptor path.
/// A new id held by a catalog record or by a `remote_only` row is a
/// collision. Dry runs plan and report without touching the filesystem or
/// the catalog.
pub fn rename_pending(
    catalog: &mut Catalog,
    remote_only: &BTreeMap<String, Descriptor>,
    config: &CatalogConfig,
    dry_run: bool,
) -> RenameOutcome {
    let pending: Vec<(String, String)> = catalog
        .iter()
        .filter_map(|(id, d)| {
            let new_id = d.get(fields::RENAME_TO)?.as_str()?.trim();
            (!new_id.is_empty() && new_id != id).then(|| (id.to_string(), new_id.to_string()))
        })
        .collect();

    let mut outcome = RenameOutcome::default();
    for (old_id, new_id) in pending {
        if remote_only.contains_key(&new_id) {
            outcome.failures.push(collision(&old_id, &new_id));
            continue;
        }
        match rename_one(catalog, config, &old_id, &new_id, dry_run) {
            Ok(record) => outcome.records.push(record),
            Err(e) => outcome.failures.push(rename_failure(&old_id, &new_id, &e)),
        }
    }
    outcome
}

fn rename_failure(old_id: &str, new_id: &str, e: &RenameError) -> RecordFailure {
    RecordFailure::new(
        e.code(),
        old_id,
        Stage::Rename,
        format!("{} -> {}: {}", old_id, new_id, e),
    )
}

fn collision(old_id: &str, new_id: &str) -> RecordFailure {
    rename_failure(old_id, new_id, &RenameError::IdCollision(new_id.to_string()))
}

fn rename_one(
    catalog: &mut Catalog,
    config: &CatalogConfig,
    old_id: &str,
    new_id: &str,
    dry_run: bool,
) -> Result<RenameRecord, RenameError> {
    if catalog.contains(new_id) {
        return Err(RenameError::IdCollision(new_id.to_string()));
    }
    let dir = catalog
        .get(old_id)
        .and_then(|d| d.dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| RenameError::DirectoryMissing(config.songs_dir.join(old_id)))?;

    let plan = plan_rename(&dir, old_id, new_id, &config.manifest_file)?;
    let record = RenameRecord {
        old_id: old_id.to_string(),
        new_id: new_id.to_string(),
        dir: plan.new_dir.clone(),
        files_renamed: plan.files.len(),
        manifests_rewritten: plan.manifest_count(),
        dry_run,
    };
    if dry_run {
        return Ok(record);
    }

    apply_rename(&plan)?;

    if let Some(mut descriptor) = catalog.remove(old_id) {
        descriptor.set(fields::ID, new_id);
        descriptor.set(fields::RENAME_TO, "");
        let file_name = descriptor
            .get(fields::SONG_FILE_NAME)
            .and_then(FieldValue::as_str)
            .and_then(|name| substitute_token(name, old_id, new_id));
        if let Some(file_name) = file_name {
            descriptor.set(fields::SONG_FILE_NAME, file_name);
        }
        let descriptor_name = descriptor
            .path()
            .and_then(Path::file_name)
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| config.descriptor_file.clone().into());
        descriptor.set_path(plan.new_dir.join(descriptor_name));
        catalog.insert(new_id, descriptor);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::decode_utf16le;
    use songbook_schema::{Descriptor, DiagnosticCode};

    #[test]
    fn test_token_substitution() {
        assert_eq!(substitute_token("abc", "abc", "xyz").as_deref(), Some("xyz"));
        assert_eq!(substitute_token("abc.tja", "abc", "xyz").as_deref(), Some("xyz.tja"));
        assert_eq!(substitute_token("song_abc.bin", "abc", "xyz").as_deref(), Some("song_xyz.bin"));
        assert_eq!(substitute_token("abc_x_1.bin", "abc", "xyz").as_deref(), Some("xyz_x_1.bin"));
        assert_eq!(substitute_token("abc_abc.bin", "abc", "x").as_deref(), Some("x_x.bin"));
        assert_eq!(substitute_token("abcd.tja", "abc", "xyz"), None);
        assert_eq!(substitute_token("data.json", "abc", "xyz"), None);
        assert_eq!(substitute_token("xabc_e.bin", "abc", "xyz"), None);
    }

    fn library() -> (tempfile::TempDir, CatalogConfig, Catalog) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("abc");
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["abc.tja", "abc_e.bin", "song_abc.bin", "data.json", "cover.png"] {
            std::fs::write(dir.join(name), name).unwrap();
        }
        Manifest::for_dir(tmp.path().join("conversion.json"), "abc")
            .write()
            .unwrap();

        let mut descriptor = Descriptor::with_id("abc");
        descriptor.set(fields::RENAME_TO, "xyz123");
        descriptor.set(fields::SONG_FILE_NAME, "song_abc");
        descriptor.set_path(dir.join("data.json"));
        let mut catalog = Catalog::new();
        catalog.insert("abc", descriptor);

        let config = CatalogConfig::new(tmp.path());
        (tmp, config, catalog)
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_rename_cascade() {
        let (tmp, config, mut catalog) = library();

        let outcome = rename_pending(&mut catalog, &BTreeMap::new(), &config, false);
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].files_renamed, 3);
        assert_eq!(outcome.records[0].manifests_rewritten, 1);

        let new_dir = tmp.path().join("xyz123");
        assert!(!tmp.path().join("abc").exists());
        assert_eq!(
            names(&new_dir),
            vec!["cover.png", "data.json", "song_xyz123.bin", "xyz123.tja", "xyz123_e.bin"]
        );

        let manifest = decode_utf16le(&std::fs::read(tmp.path().join("conversion.json")).unwrap()).unwrap();
        assert!(manifest.contains(r#""f":".\\xyz123""#));

        assert!(!catalog.contains("abc"));
        let d = catalog.get("xyz123").unwrap();
        assert_eq!(d.id(), Some("xyz123"));
        assert_eq!(d.get(fields::RENAME_TO), Some(&FieldValue::Str(String::new())));
        assert_eq!(d.get(fields::SONG_FILE_NAME), Some(&FieldValue::Str("song_xyz123".into())));
        assert_eq!(d.path(), Some(new_dir.join("data.json").as_path()));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (tmp, config, mut catalog) = library();
        let before = catalog.clone();

        let outcome = rename_pending(&mut catalog, &BTreeMap::new(), &config, true);
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].dry_run);
        assert!(tmp.path().join("abc/abc.tja").exists());
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_collision_with_catalog_id_fails() {
        let (tmp, config, mut catalog) = library();
        catalog.insert("xyz123", Descriptor::with_id("xyz123"));

        let outcome = rename_pending(&mut catalog, &BTreeMap::new(), &config, false);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].code, DiagnosticCode::RenameFailed);
        assert!(tmp.path().join("abc/abc.tja").exists());
    }

    #[test]
    fn test_collision_with_remote_only_id_fails() {
        let (tmp, config, mut catalog) = library();
        let remote_only: BTreeMap<String, Descriptor> =
            [("xyz123".to_string(), Descriptor::with_id("xyz123"))].into_iter().collect();

        let outcome = rename_pending(&mut catalog, &remote_only, &config, false);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "abc");
        assert!(outcome.failures[0].message.contains("already in use"));
        assert!(tmp.path().join("abc/abc.tja").exists());
        assert!(catalog.contains("abc"));
    }

    #[test]
    fn test_existing_target_fails_before_any_change() {
        let (tmp, config, mut catalog) = library();
        std::fs::write(tmp.path().join("abc/xyz123_e.bin"), b"taken").unwrap();

        let outcome = rename_pending(&mut catalog, &BTreeMap::new(), &config, false);
        assert_eq!(outcome.failures.len(), 1);
        assert!(tmp.path().join("abc/abc.tja").exists());
        assert!(catalog.contains("abc"));
    }

    #[test]
    fn test_failed_step_rolls_back() {
        let (tmp, _, _) = library();
        let dir = tmp.path().join("abc");
        let mut plan = plan_rename(&dir, "abc", "xyz123", "conversion.json").unwrap();
        // Make the directory rename fail after files and manifest are done.
        plan.new_dir = tmp.path().join("missing-parent/xyz123");

        assert!(apply_rename(&plan).is_err());
        assert_eq!(
            names(&dir),
            vec!["abc.tja", "abc_e.bin", "cover.png", "data.json", "song_abc.bin"]
        );
        let manifest = decode_utf16le(&std::fs::read(tmp.path().join("conversion.json")).unwrap()).unwrap();
        assert!(manifest.contains(r#""f":".\\abc""#));
    }

    #[test]
    fn test_failed_rollback_reports_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("conversion.json");
        std::fs::write(&manifest, b"rewritten").unwrap();
        let vanished = tmp.path().join("xyz_e.bin");

        let done = vec![
            Step::Rewrote {
                path: manifest.clone(),
                original: b"original".to_vec(),
            },
            Step::Renamed {
                from: tmp.path().join("abc_e.bin"),
                to: vanished.clone(),
            },
        ];
        let err = undo(RenameError::DirectoryMissing(tmp.path().join("abc")), done);

        match &err {
            RenameError::RollbackFailed { source, leftovers } => {
                assert!(matches!(**source, RenameError::DirectoryMissing(_)));
                assert_eq!(leftovers, &vec![vanished]);
            }
            other => panic!("expected RollbackFailed, got {:?}", other),
        }
        assert!(err.to_string().contains("rollback failed"));
        assert_eq!(err.code(), DiagnosticCode::RenameFailed);
        assert_eq!(std::fs::read(&manifest).unwrap(), b"original");
    }

    #[test]
    fn test_clean_rollback_keeps_original_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("xyz.tja"), b"").unwrap();
        let done = vec![Step::Renamed {
            from: tmp.path().join("abc.tja"),
            to: tmp.path().join("xyz.tja"),
        }];

        let err = undo(RenameError::IdCollision("xyz".to_string()), done);
        assert!(matches!(err, RenameError::IdCollision(_)));
        assert!(tmp.path().join("abc.tja").exists());
    }

    #[test]
    fn test_directory_without_token_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("My Song");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("abc.tja"), b"").unwrap();

        let plan = plan_rename(&dir, "abc", "xyz", "conversion.json").unwrap();
        assert!(!plan.renames_dir());
        assert_eq!(plan.manifest_count(), 0);
        apply_rename(&plan).unwrap();
        assert!(dir.join("xyz.tja").exists());
    }
}
