//! Batch drivers for `sync` and `unwrap`.
//!
//! A sync run flows through the stages in a fixed order:
//!
//! 1. scan the songs directory and load the remote copy
//! 2. reconcile (remote wins)
//! 3. assign `order` ranks
//! 4. apply pending id renames
//! 5. patch blob volumes, when enabled
//! 6. check every row against the registry, then write
//!
//! Fatal errors abort the batch before step 6 writes anything. Per-record
//! failures in steps 4 and 5, and descriptor write failures in step 6,
//! exclude the record from that stage only and are collected in the report.

use songbook_schema::{fields, FieldValue, Schema};

use crate::blobs::{patch_catalog, unwrap_catalog};
use crate::catalog::Catalog;
use crate::config::{CatalogConfig, RunOptions};
use crate::error::CatalogError;
use crate::loaders::{load_remote, scan_library, SheetStore, Table};
use crate::order::assign_order;
use crate::reconcile::reconcile;
use crate::rename::rename_pending;
use crate::report::{SyncReport, UnwrapReport};
use crate::writers::{checked_rows, publish_sheet, remote_only_warnings, write_descriptors, write_table};

/// Runs one reconciliation batch.
///
/// `sheet` is the spreadsheet to read from (and, with
/// [`RunOptions::write_sheet`], publish to). Without one the tabular export
/// serves as the remote copy.
pub fn run_sync(
    config: &CatalogConfig,
    options: RunOptions,
    sheet: Option<&dyn SheetStore>,
) -> Result<SyncReport, CatalogError> {
    let schema = Schema::standard();
    let mut report = SyncReport::new(&config.songs_dir, options.dry_run);

    let scan = scan_library(config, schema)?;
    report.on_disk = scan.songs.len();
    report.diagnostics.extend(scan.diagnostics);

    let remote = load_remote(config, schema, sheet)?;
    report.remote_source = remote.source;
    report.remote = remote.records.records.len();
    report.diagnostics.extend(remote.records.diagnostics);

    let merged = reconcile(scan.songs, remote.records.records);
    let mut catalog = merged.catalog;
    report.imported = merged.imported;
    report.replaced = merged.replaced.len();
    report.remote_only = merged.remote_only.keys().cloned().collect();
    report.diagnostics.extend(remote_only_warnings(&merged.remote_only));

    report.rank_changes = assign_order(&mut catalog, config.order_key);

    let renames = rename_pending(&mut catalog, &merged.remote_only, config, options.dry_run);
    report.renames = renames.records;
    report.failures.extend(renames.failures);

    if options.patch_volume {
        let patches = patch_catalog(&catalog, options.dry_run);
        report.patches = patches.records;
        report.failures.extend(patches.failures);
    }

    let rows = checked_rows(schema, &catalog, &merged.remote_only)?;
    if options.dry_run {
        return Ok(report);
    }

    let written = write_descriptors(schema, &catalog);
    report.descriptors_written = written.written;
    report.failures.extend(written.failures);
    write_table(schema, &rows, &config.tabular_path)?;
    report.table_written = Some(config.tabular_path.clone());

    if options.write_sheet {
        if let Some(sheet) = sheet {
            publish_sheet(schema, &rows, sheet)?;
            report.sheet_published = Some(sheet.location().to_path_buf());
        }
    }

    Ok(report)
}

/// Decompresses the blobs of every gzip-flagged song on disk and clears the
/// flag in its descriptor.
///
/// The flag is cleared in the tabular export and, when one is given, the
/// spreadsheet as well, so the next sync does not restore it from the remote
/// copy. Both tables are read before any blob is touched.
pub fn unwrap_library(
    config: &CatalogConfig,
    dry_run: bool,
    sheet: Option<&dyn SheetStore>,
) -> Result<UnwrapReport, CatalogError> {
    let schema = Schema::standard();
    let mut report = UnwrapReport::new(&config.songs_dir, dry_run);

    let scan = scan_library(config, schema)?;
    report.diagnostics.extend(scan.diagnostics);

    let mut table = if config.tabular_path.exists() {
        Some(Table::read_path(&config.tabular_path)?)
    } else {
        None
    };
    let mut sheet_table = sheet.map(|s| s.fetch()).transpose()?;

    let mut catalog: Catalog = scan.songs.into_iter().collect();
    let stage = unwrap_catalog(schema, &mut catalog, dry_run);
    report.unwrapped = stage.records;
    report.descriptors_updated = stage.cleared;
    report.failures = stage.failures;

    if dry_run || report.descriptors_updated.is_empty() {
        return Ok(report);
    }

    let cleared = FieldValue::Bool(false).to_cell();
    if let Some(table) = table.as_mut() {
        if table.set_cells(fields::GZIPPED, &cleared, &report.descriptors_updated) > 0 {
            table.write_path(&config.tabular_path)?;
            report.table_written = Some(config.tabular_path.clone());
        }
    }
    if let (Some(sheet), Some(table)) = (sheet, sheet_table.as_mut()) {
        if table.set_cells(fields::GZIPPED, &cleared, &report.descriptors_updated) > 0 {
            sheet.publish(table)?;
            report.sheet_published = Some(sheet.location().to_path_buf());
        }
    }

    Ok(report)
}
