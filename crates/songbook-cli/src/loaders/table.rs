//! Tabular rows: the local CSV export and spreadsheet snapshots.

use std::collections::BTreeMap;
use std::path::Path;

use songbook_blob::replace_file;
use songbook_schema::{
    conform, fields, unflatten, Descriptor, Diagnostic, DiagnosticCode, FieldType, FieldValue, FlatRecord,
    Schema, SchemaError, BOM,
};

use crate::error::CatalogError;

/// A header row plus data rows of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parses CSV text. A leading BOM is skipped.
    pub fn parse(text: &str) -> Result<Self, csv::Error> {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());

        let header = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self { header, rows })
    }

    /// Reads a CSV file.
    pub fn read_path(path: &Path) -> Result<Self, CatalogError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| CatalogError::table_read(path, e))?;
        Self::parse(&text).map_err(|e| CatalogError::table_read(path, e))
    }

    /// Builds a table with the registry as header, one row per record.
    pub fn from_records(schema: &Schema, records: &[FlatRecord]) -> Self {
        Self {
            header: schema.names().map(str::to_string).collect(),
            rows: records.iter().map(|r| r.cells(schema)).collect(),
        }
    }

    /// Serializes as BOM-prefixed UTF-8 CSV with `\n` line endings.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut buf = BOM.to_string().into_bytes();
        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(&mut buf);
            writer.write_record(&self.header)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        Ok(buf)
    }

    /// Sets `column` to `value` in every row whose id is in `ids`.
    ///
    /// Returns how many cells changed. A table lacking the id column or
    /// `column` is left alone.
    pub fn set_cells(&mut self, column: &str, value: &str, ids: &[String]) -> usize {
        let position = |name: &str| self.header.iter().position(|h| h == name);
        let (Some(id_col), Some(col)) = (position(fields::ID), position(column)) else {
            return 0;
        };

        let mut changed = 0;
        for row in &mut self.rows {
            if !row.get(id_col).is_some_and(|id| ids.contains(id)) {
                continue;
            }
            if let Some(cell) = row.get_mut(col) {
                if cell.as_str() != value {
                    *cell = value.to_string();
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Atomically writes the table to `path`.
    pub fn write_path(&self, path: &Path) -> Result<(), CatalogError> {
        let bytes = self
            .to_csv_bytes()
            .map_err(|e| CatalogError::table_write(path, e))?;
        replace_file(path, &bytes).map_err(|e| CatalogError::table_write(path, e))
    }
}

/// Records read from a table, conformed and keyed by id.
#[derive(Debug, Default)]
pub struct TableRecords {
    pub records: BTreeMap<String, Descriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts table rows into conformed descriptors.
///
/// Every header column must be a registry field. Cells are parsed per field
/// type; empty numeric and boolean cells count as absent and are defaulted.
/// Rows without an id are skipped. When an id repeats, the first row wins.
pub fn records_from_table(table: &Table, schema: &Schema) -> Result<TableRecords, CatalogError> {
    let mut columns = Vec::with_capacity(table.header.len());
    for name in &table.header {
        let spec = schema
            .field(name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.clone()))?;
        columns.push(spec);
    }

    let mut out = TableRecords::default();
    for (index, row) in table.rows.iter().enumerate() {
        let mut flat = FlatRecord::new();
        for (spec, cell) in columns.iter().zip(row) {
            if spec.ty != FieldType::Str && cell.trim().is_empty() {
                continue;
            }
            // Unparseable cells stay text so that conforming reports them.
            let value = FieldValue::parse_cell(spec.ty, cell)
                .unwrap_or_else(|| FieldValue::Str(cell.clone()));
            flat.insert(spec.name, value);
        }

        let id = flat.id().trim().to_string();
        if id.is_empty() {
            out.diagnostics.push(Diagnostic::with_field(
                DiagnosticCode::InvalidValue,
                "",
                songbook_schema::fields::ID,
                format!("row {} has an empty id, skipped", index + 2),
            ));
            continue;
        }
        flat.insert(songbook_schema::fields::ID, id.as_str());

        if out.records.contains_key(&id) {
            out.diagnostics.push(Diagnostic::new(
                DiagnosticCode::DuplicateSongId,
                &id,
                format!("row {} repeats id '{}', skipped", index + 2, id),
            ));
            continue;
        }

        out.diagnostics.extend(conform(schema, &mut flat));
        out.records.insert(id, unflatten(&flat, schema));
    }

    Ok(out)
}
