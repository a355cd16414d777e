//! Unwrap command implementation

use anyhow::Result;
use colored::Colorize;
use songbook_blob::RewrapOutcome;
use std::process::ExitCode;

use crate::config::{CatalogConfig, ConfigOverrides};
use crate::loaders::{CsvSheet, SheetStore};
use crate::pipeline::unwrap_library;
use crate::report::UnwrapReport;

use super::json_output::{error_codes, JsonError, UnwrapOutput};
use super::reporting::{print_diagnostics, print_failures, print_status};

/// Arguments of the unwrap command, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct UnwrapArgs<'a> {
    pub songs_dir: &'a str,
    pub config: Option<&'a str>,
    pub tabular: Option<&'a str>,
    pub sheet: Option<&'a str>,
    pub dry_run: bool,
}

/// Run the unwrap command.
///
/// Cleared flags are also written to the tabular export and, when one is
/// configured, the spreadsheet snapshot.
pub fn run(args: UnwrapArgs<'_>, json_output: bool) -> Result<ExitCode> {
    let overrides = ConfigOverrides {
        songs_dir: Some(args.songs_dir),
        tabular: args.tabular,
        sheet: args.sheet,
        ..ConfigOverrides::default()
    };
    let config = match CatalogConfig::resolve(args.config, overrides) {
        Ok(config) => config,
        Err(e) if json_output => {
            let output = UnwrapOutput::failure(vec![JsonError::new(error_codes::CONFIG, format!("{:#}", e))]);
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e),
    };

    let sheet = config.sheet_path.as_ref().map(CsvSheet::new);
    let result = unwrap_library(
        &config,
        args.dry_run,
        sheet.as_ref().map(|s| s as &dyn SheetStore),
    );

    if json_output {
        let output = match result {
            Ok(report) => UnwrapOutput::from_report(report),
            Err(e) => UnwrapOutput::failure(vec![JsonError::from(&e)]),
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

fn print_report(report: &UnwrapReport) {
    println!("{}", "Blob Unwrap Report".cyan().bold());
    println!("{}", "==================".dimmed());

    if report.dry_run {
        println!("{} Dry run, no files will be changed\n", "NOTE:".yellow());
    }

    for record in &report.unwrapped {
        if let RewrapOutcome::Rewritten { before, after } = record.outcome {
            println!(
                "{} {} {}",
                "UNWRAP".green(),
                record.blob.display(),
                format!("({} -> {} bytes)", before, after).dimmed()
            );
        }
    }

    print_diagnostics(&report.diagnostics);
    print_failures(&report.failures);

    println!("\n{}", "Summary".cyan().bold());
    println!("{}", "-------".dimmed());
    println!("Blobs unwrapped:     {}", report.unwrapped.len());
    println!("Descriptors updated: {}", report.descriptors_updated.len());
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
    fn test_unwrap_updates_tabular_export() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("songs/abc");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("data.json"), r#"{"id":"abc","areFilesGZipped":true}"#).unwrap();
        std::fs::write(dir.join("song_abc.bin"), songbook_blob::gzip(&[0u8; 600]).unwrap()).unwrap();
        let table = tmp.path().join("metadata.csv");
        std::fs::write(&table, "id,areFilesGZipped\nabc,True\n").unwrap();

        let songs = tmp.path().join("songs");
        let args = UnwrapArgs {
            songs_dir: songs.to_str().unwrap(),
            tabular: table.to_str(),
            ..UnwrapArgs::default()
        };
        assert_eq!(run(args, true).unwrap(), ExitCode::SUCCESS);
        assert!(std::fs::read_to_string(&table).unwrap().contains("abc,False"));
    }
}
