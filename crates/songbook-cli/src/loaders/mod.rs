//! Source loaders for the three copies of the catalog.
//!
//! - [`disk`]: descriptors inside song directories
//! - [`table`]: the local tabular export
//! - [`sheet`]: the remote spreadsheet, the source of truth when configured

pub mod disk;
pub mod sheet;
pub mod table;

pub use disk::{read_descriptor, scan_library, DiskScan};
pub use sheet::{CsvSheet, SheetStore};
pub use table::{records_from_table, Table, TableRecords};

use std::path::PathBuf;

use songbook_schema::Schema;

use crate::config::CatalogConfig;
use crate::error::CatalogError;

/// The remote copy selected for reconciliation.
#[derive(Debug, Default)]
pub struct RemoteTable {
    /// Where the rows came from; `None` when no source exists yet
    pub source: Option<PathBuf>,
    pub records: TableRecords,
}

/// Loads the remote copy: the spreadsheet when one is given, otherwise the
/// tabular export. A missing tabular export is an empty remote copy, so the
/// first run imports everything from disk.
pub fn load_remote(
    config: &CatalogConfig,
    schema: &Schema,
    sheet: Option<&dyn SheetStore>,
) -> Result<RemoteTable, CatalogError> {
    let (source, table) = match sheet {
        Some(sheet) => (sheet.location().to_path_buf(), sheet.fetch()?),
        None if config.tabular_path.exists() => (
            config.tabular_path.clone(),
            Table::read_path(&config.tabular_path)?,
        ),
        None => return Ok(RemoteTable::default()),
    };

    Ok(RemoteTable {
        source: Some(source),
        records: records_from_table(&table, schema)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tabular_export_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = CatalogConfig::new(tmp.path());
        config.tabular_path = tmp.path().join("metadata.csv");

        let remote = load_remote(&config, Schema::standard(), None).unwrap();
        assert!(remote.source.is_none());
        assert!(remote.records.records.is_empty());
    }

    #[test]
    fn test_sheet_takes_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = CatalogConfig::new(tmp.path());
        config.tabular_path = tmp.path().join("metadata.csv");
        std::fs::write(&config.tabular_path, "id\nfrom-table\n").unwrap();
        std::fs::write(tmp.path().join("sheet.csv"), "id\nfrom-sheet\n").unwrap();

        let sheet = CsvSheet::new(tmp.path().join("sheet.csv"));
        let remote = load_remote(&config, Schema::standard(), Some(&sheet)).unwrap();
        assert_eq!(remote.source, Some(tmp.path().join("sheet.csv")));
        assert!(remote.records.records.contains_key("from-sheet"));
        assert!(!remote.records.records.contains_key("from-table"));
    }
}
