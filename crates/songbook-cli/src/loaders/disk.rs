//! Disk scan of song directories.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use songbook_blob::parse_song_blob;
use songbook_schema::{fields, Descriptor, Diagnostic, DiagnosticCode, Schema};
use walkdir::WalkDir;

use crate::catalog::normalize;
use crate::config::CatalogConfig;
use crate::error::CatalogError;

/// Descriptors found under the songs directory.
#[derive(Debug, Default)]
pub struct DiskScan {
    /// Normalized descriptors keyed by song id, each carrying its file path
    pub songs: BTreeMap<String, Descriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans the songs directory for descriptors and song blob markers.
///
/// Directories are visited in sorted path order, so when two descriptors
/// share an id the first path wins. Subtrees named in `exclude_dirs` are
/// skipped.
pub fn scan_library(config: &CatalogConfig, schema: &Schema) -> Result<DiskScan, CatalogError> {
    let root = &config.songs_dir;
    if !root.is_dir() {
        return Err(CatalogError::SongsDirMissing(root.clone()));
    }

    let mut descriptors: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut markers: BTreeMap<PathBuf, String> = BTreeMap::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !config.is_excluded(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };

        if name == config.descriptor_file {
            descriptors.insert(dir.to_path_buf(), entry.path().to_path_buf());
        } else if let Some(id) = parse_song_blob(name) {
            markers.entry(dir.to_path_buf()).or_insert_with(|| id.to_string());
        }
    }

    let mut scan = DiskScan::default();
    let dirs: BTreeSet<&PathBuf> = descriptors.keys().chain(markers.keys()).collect();

    for dir in dirs {
        let marker = markers.get(dir).map(String::as_str);
        let Some(path) = descriptors.get(dir) else {
            let id = marker.unwrap_or_default();
            scan.diagnostics.push(Diagnostic::new(
                DiagnosticCode::MissingDescriptor,
                id,
                format!(
                    "{} has a song blob but no {} (failed conversion?)",
                    dir.display(),
                    config.descriptor_file
                ),
            ));
            continue;
        };

        let fallback = fallback_id(dir, marker);
        let (descriptor, diagnostic) = read_descriptor(path, &fallback);
        scan.diagnostics.extend(diagnostic);

        let (descriptor, diagnostics) = normalize(schema, &descriptor);
        scan.diagnostics.extend(diagnostics);

        let id = descriptor.id().unwrap_or_default().to_string();
        if let Some(existing) = scan.songs.get(&id) {
            let kept = existing
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            scan.diagnostics.push(Diagnostic::new(
                DiagnosticCode::DuplicateSongId,
                &id,
                format!("{} ignored, id already loaded from {}", path.display(), kept),
            ));
            continue;
        }
        scan.songs.insert(id, descriptor);
    }

    Ok(scan)
}

/// Reads one descriptor file.
///
/// Never fails: an unreadable, empty or malformed file yields a descriptor
/// seeded only with `fallback_id`, plus a diagnostic. A readable descriptor
/// without an id gets `fallback_id` too.
pub fn read_descriptor(path: &Path, fallback_id: &str) -> (Descriptor, Option<Diagnostic>) {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| Descriptor::from_json_str(&text).map_err(|e| e.to_string()));

    let (mut descriptor, diagnostic) = match parsed {
        Ok(descriptor) if descriptor.id().is_some_and(|id| !id.is_empty()) => (descriptor, None),
        Ok(mut descriptor) => {
            descriptor.set(fields::ID, fallback_id);
            let diagnostic = Diagnostic::with_field(
                DiagnosticCode::MissingField,
                fallback_id,
                fields::ID,
                format!("{} has no id, using '{}'", path.display(), fallback_id),
            );
            (descriptor, Some(diagnostic))
        }
        Err(message) => {
            let diagnostic = Diagnostic::new(
                DiagnosticCode::UnreadableDescriptor,
                fallback_id,
                format!("{}: {}, replaced with defaults", path.display(), message),
            );
            (Descriptor::with_id(fallback_id), Some(diagnostic))
        }
    };

    descriptor.set_path(path);
    (descriptor, diagnostic)
}

/// Song id used when a descriptor cannot supply one: the blob marker's id,
/// else the directory name.
fn fallback_id(dir: &Path, marker: Option<&str>) -> String {
    match marker {
        Some(id) => id.to_string(),
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}
