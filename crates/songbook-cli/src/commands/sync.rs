//! Sync command implementation
//!
//! Reconciles the songs directory with the remote copy and writes the
//! canonical catalog back to every copy.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use crate::config::{CatalogConfig, ConfigOverrides, OrderKey, RunOptions};
use crate::loaders::{CsvSheet, SheetStore};
use crate::pipeline::run_sync;
use crate::report::SyncReport;

use super::json_output::{error_codes, JsonError, SyncOutput};
use super::reporting::{print_diagnostics, print_failures, print_status};

/// Arguments of the sync command, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncArgs<'a> {
    pub songs_dir: &'a str,
    pub config: Option<&'a str>,
    pub tabular: Option<&'a str>,
    pub sheet: Option<&'a str>,
    pub order_by: Option<OrderKey>,
    pub patch_volume: bool,
    pub write_sheet: bool,
    pub dry_run: bool,
}

/// Run the sync command.
///
/// # Returns
/// Exit code: 0 if every record made it through, 1 on a fatal error or any
/// per-record failure
pub fn run(args: SyncArgs<'_>, json_output: bool) -> Result<ExitCode> {
    let overrides = ConfigOverrides {
        songs_dir: Some(args.songs_dir),
        tabular: args.tabular,
        sheet: args.sheet,
        order_key: args.order_by,
    };
    let config = match CatalogConfig::resolve(args.config, overrides) {
        Ok(config) => config,
        Err(e) if json_output => {
            let mut error = JsonError::new(error_codes::CONFIG, format!("{:#}", e));
            if let Some(path) = args.config {
                error = error.with_file(path);
            }
            let output = SyncOutput::failure(vec![error]);
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e),
    };

    let options = RunOptions {
        dry_run: args.dry_run,
        patch_volume: args.patch_volume,
        write_sheet: args.write_sheet,
    };
    let sheet = config.sheet_path.as_ref().map(CsvSheet::new);
    let result = run_sync(&config, options, sheet.as_ref().map(|s| s as &dyn SheetStore));

    if json_output {
        let output = match result {
            Ok(report) => SyncOutput::from_report(report),
            Err(e) => SyncOutput::failure(vec![JsonError::from(&e)]),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(if output.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    let report = result.map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
    print_report(&report);
    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_report(report: &SyncReport) {
    println!("{}", "Catalog Sync Report".cyan().bold());
    println!("{}", "===================".dimmed());

    if report.dry_run {
        println!("{} Dry run, no files will be changed\n", "NOTE:".yellow());
    }

    println!("{} {}", "Songs directory:".dimmed(), report.songs_dir.display());
    match &report.remote_source {
        Some(source) => println!("{} {}", "Remote copy:".dimmed(), source.display()),
        None => println!("{} none (first run)", "Remote copy:".dimmed()),
    }
    println!(
        "{} {} on disk, {} remote, {} replaced, {} imported, {} remote-only\n",
        "Records:".dimmed(),
        report.on_disk,
        report.remote,
        report.replaced,
        report.imported.len(),
        report.remote_only.len()
    );

    for id in &report.imported {
        println!("{} {}", "IMPORT".green(), id);
    }
    for change in &report.rank_changes {
        let old = change
            .old
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {} {} -> {} {}",
            "ORDER".blue(),
            change.id,
            old,
            change.new,
            change.title.dimmed()
        );
    }
    for rename in &report.renames {
        println!(
            "{} {} -> {} ({} files, {} manifests)",
            "RENAME".magenta(),
            rename.old_id,
            rename.new_id,
            rename.files_renamed,
            rename.manifests_rewritten
        );
    }
    for patch in &report.patches {
        if patch.outcome.is_patched() {
            println!("{} {} {}", "PATCH".green(), patch.id, patch.blob.display().to_string().dimmed());
        } else {
            println!("{} {} {}", "OK".dimmed(), patch.id, "(volume already set)".dimmed());
        }
    }

    print_diagnostics(&report.diagnostics);
    print_failures(&report.failures);

    println!("\n{}", "Summary".cyan().bold());
    println!("{}", "-------".dimmed());
    println!("Ranks changed:       {}", report.rank_changes.len());
    println!("Renamed:             {}", report.renames.len());
    println!("Blobs patched:       {}", report.patched_count());
    println!("Descriptors written: {}", report.descriptors_written);
    if let Some(path) = &report.table_written {
        println!("Table written:       {}", path.display());
    }
    if let Some(path) = &report.sheet_published {
        println!("Sheet published:     {}", path.display());
    }

    print_status(report.success(), report.dry_run);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_songs_dir_in_json_mode_exits_1() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let args = SyncArgs {
            songs_dir: missing.to_str().unwrap(),
            ..SyncArgs::default()
        };
        assert_eq!(run(args, true).unwrap(), ExitCode::from(1));
    }

    #[test]
    fn test_missing_songs_dir_in_text_mode_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let args = SyncArgs {
            songs_dir: missing.to_str().unwrap(),
            ..SyncArgs::default()
        };
        let err = run(args, false).unwrap_err();
        assert!(err.to_string().starts_with("E002"));
    }

    #[test]
    fn test_sync_empty_library() {
        let tmp = tempfile::tempdir().unwrap();
        let songs = tmp.path().join("songs");
        std::fs::create_dir(&songs).unwrap();
        let table = tmp.path().join("metadata.csv");
        let args = SyncArgs {
            songs_dir: songs.to_str().unwrap(),
            tabular: table.to_str(),
            ..SyncArgs::default()
        };
        assert_eq!(run(args, true).unwrap(), ExitCode::SUCCESS);
        assert!(table.exists());
    }
}
