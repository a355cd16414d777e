//! Writers for descriptors, the tabular export and the spreadsheet.
//!
//! Every row is checked against the registry before the first write, so a
//! schema mismatch aborts the batch with nothing written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use songbook_blob::replace_file;
use songbook_schema::{
    check_complete, flatten, Descriptor, Diagnostic, DiagnosticCode, FlatRecord, Schema, BOM,
};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::loaders::{SheetStore, Table};
use crate::report::{RecordFailure, Stage};

/// Checks every record and returns the table rows in ascending id order.
///
/// Remote-only records are carried through so the tabular and sheet copies
/// keep them. An id present in both sets is fatal.
pub fn checked_rows(
    schema: &Schema,
    catalog: &Catalog,
    remote_only: &BTreeMap<String, Descriptor>,
) -> Result<Vec<FlatRecord>, CatalogError> {
    let mut rows: BTreeMap<&str, FlatRecord> = BTreeMap::new();
    for (id, descriptor) in catalog.iter().chain(remote_only.iter().map(|(k, v)| (k.as_str(), v))) {
        let flat = flatten(descriptor);
        check_complete(schema, &flat)?;
        if rows.insert(id, flat).is_some() {
            return Err(CatalogError::DuplicateId(id.to_string()));
        }
    }
    Ok(rows.into_values().collect())
}

/// Warnings for remote records that have no directory to write into.
pub fn remote_only_warnings(remote_only: &BTreeMap<String, Descriptor>) -> Vec<Diagnostic> {
    remote_only
        .keys()
        .map(|id| {
            Diagnostic::new(
                DiagnosticCode::MissingOnDisk,
                id,
                "present in the remote copy but not on disk, descriptor not written",
            )
        })
        .collect()
}

/// Encodes a descriptor body: BOM, then tab-indented JSON in registry order.
pub fn encode_descriptor(schema: &Schema, descriptor: &Descriptor) -> Result<Vec<u8>, serde_json::Error> {
    let json = descriptor.to_json_string(schema)?;
    let mut text = String::with_capacity(json.len() + BOM.len_utf8());
    text.push(BOM);
    text.push_str(&json);
    Ok(text.into_bytes())
}

/// Writes one descriptor to its path. Returns `false` when the file already
/// held the same bytes and was left untouched.
pub fn write_descriptor(schema: &Schema, descriptor: &Descriptor) -> Result<bool, CatalogError> {
    let path = descriptor
        .path()
        .ok_or_else(|| CatalogError::DescriptorWrite {
            path: PathBuf::from(descriptor.id().unwrap_or_default()),
            message: "descriptor has no path".to_string(),
        })?;
    let fail = |message: String| CatalogError::DescriptorWrite {
        path: path.to_path_buf(),
        message,
    };

    let bytes = encode_descriptor(schema, descriptor).map_err(|e| fail(e.to_string()))?;
    if std::fs::read(path).is_ok_and(|existing| existing == bytes) {
        return Ok(false);
    }
    replace_file(path, &bytes).map_err(|e| fail(e.to_string()))?;
    Ok(true)
}

/// Results of the descriptor write stage.
#[derive(Debug, Default)]
pub struct WriteStage {
    /// Number of files whose content changed
    pub written: usize,
    pub failures: Vec<RecordFailure>,
}

/// Writes every catalog descriptor.
///
/// A descriptor that cannot be written is reported and skipped; the others
/// are still written. Its stale file is corrected by the next run, since the
/// tables carry the reconciled record.
pub fn write_descriptors(schema: &Schema, catalog: &Catalog) -> WriteStage {
    let mut stage = WriteStage::default();
    for (id, descriptor) in catalog.iter() {
        match write_descriptor(schema, descriptor) {
            Ok(true) => stage.written += 1,
            Ok(false) => {}
            Err(e) => stage.failures.push(RecordFailure::new(
                DiagnosticCode::WriteFailed,
                id,
                Stage::Write,
                e.to_string(),
            )),
        }
    }
    stage
}

/// Writes the tabular export.
pub fn write_table(schema: &Schema, rows: &[FlatRecord], path: &Path) -> Result<(), CatalogError> {
    Table::from_records(schema, rows).write_path(path)
}

/// Publishes the table to the spreadsheet.
pub fn publish_sheet(schema: &Schema, rows: &[FlatRecord], sheet: &dyn SheetStore) -> Result<(), CatalogError> {
    sheet.publish(&Table::from_records(schema, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::normalize;
    use songbook_schema::SchemaError;

    fn complete(id: &str, path: Option<&Path>) -> Descriptor {
        let mut d = Descriptor::with_id(id);
        if let Some(path) = path {
            d.set_path(path);
        }
        normalize(Schema::standard(), &d).0
    }

    #[test]
    fn test_rows_include_remote_only_in_id_order() {
        let catalog: Catalog = [("b".to_string(), complete("b", None))].into_iter().collect();
        let remote_only: BTreeMap<String, Descriptor> =
            [("a".to_string(), complete("a", None))].into_iter().collect();

        let rows = checked_rows(Schema::standard(), &catalog, &remote_only).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(remote_only_warnings(&remote_only)[0].code, DiagnosticCode::MissingOnDisk);
    }

    #[test]
    fn test_duplicate_id_aborts() {
        let catalog: Catalog = [("xyz".to_string(), complete("xyz", None))].into_iter().collect();
        let remote_only: BTreeMap<String, Descriptor> =
            [("xyz".to_string(), complete("xyz", None))].into_iter().collect();

        let err = checked_rows(Schema::standard(), &catalog, &remote_only).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(ref id) if id == "xyz"));
        assert_eq!(err.code(), "E006");
    }

    #[test]
    fn test_write_failures_are_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("data.json");
        let bad = tmp.path().join("gone/data.json");
        let catalog: Catalog = [
            ("a".to_string(), complete("a", Some(&bad))),
            ("b".to_string(), complete("b", Some(&good))),
        ]
        .into_iter()
        .collect();

        let stage = write_descriptors(Schema::standard(), &catalog);
        assert_eq!(stage.written, 1);
        assert_eq!(stage.failures.len(), 1);
        assert_eq!(stage.failures[0].id, "a");
        assert_eq!(stage.failures[0].code, DiagnosticCode::WriteFailed);
        assert_eq!(stage.failures[0].stage, Stage::Write);
        assert!(good.is_file());
    }

    #[test]
    fn test_incomplete_record_aborts() {
        let mut bad = complete("b", None);
        bad.set("legacyField", 1i64);
        let catalog: Catalog = [("b".to_string(), bad)].into_iter().collect();

        let err = checked_rows(Schema::standard(), &catalog, &BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::SchemaMismatch(SchemaError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn test_descriptor_file_format() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data.json");
        let mut d = complete("abc", Some(&path));
        d.set("songName_text", "曲名");

        assert!(write_descriptor(Schema::standard(), &d).unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("\u{feff}{\n\t\"id\": \"abc\",\n\t\"id-new\": \"\","));
        assert!(text.contains("\"text\": \"曲名\""));

        // Identical content is not rewritten.
        assert!(!write_descriptor(Schema::standard(), &d).unwrap());
    }

    #[test]
    fn test_descriptor_without_path_fails() {
        let d = complete("abc", None);
        assert!(matches!(
            write_descriptor(Schema::standard(), &d),
            Err(CatalogError::DescriptorWrite { .. })
        ));
    }
}
