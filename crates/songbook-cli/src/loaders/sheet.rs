//! Access to the remote spreadsheet.
//!
//! Transport and authentication live outside this crate. The pipeline only
//! needs to fetch the table and publish a replacement; [`CsvSheet`] does both
//! against a file snapshot of the sheet.

use std::path::{Path, PathBuf};

use super::table::Table;
use crate::error::CatalogError;

/// A spreadsheet holding one song table.
pub trait SheetStore {
    /// Human-readable location, used in reports.
    fn location(&self) -> &Path;

    /// Fetches the current table.
    fn fetch(&self) -> Result<Table, CatalogError>;

    /// Replaces the table.
    fn publish(&self, table: &Table) -> Result<(), CatalogError>;
}

/// A spreadsheet snapshot stored as a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SheetStore for CsvSheet {
    fn location(&self) -> &Path {
        &self.path
    }

    fn fetch(&self) -> Result<Table, CatalogError> {
        Table::read_path(&self.path)
    }

    fn publish(&self, table: &Table) -> Result<(), CatalogError> {
        table.write_path(&self.path)
    }
}
