//! Volume commands
//!
//! `read-volume` prints the volume stored in a single blob, `patch-volume`
//! writes one. Both operate on a file path directly, without a catalog.

use anyhow::Result;
use colored::Colorize;
use songbook_blob::{patch_volume, read_volume, BlobError, PatchOutcome, Wrapping};
use std::path::Path;
use std::process::ExitCode;

use super::json_output::{JsonError, VolumeOutput};

/// Run the read-volume command.
pub fn run_read(blob: &str, gzip: bool, json_output: bool) -> Result<ExitCode> {
    let result = read_volume(Path::new(blob), Wrapping::from_flag(gzip));

    if json_output {
        let output = match result {
            Ok(volume) => VolumeOutput {
                success: true,
                errors: Vec::new(),
                blob: blob.to_string(),
                gzip,
                volume: Some(volume),
                previous: None,
                patched: false,
            },
            Err(e) => failure_output(blob, gzip, &e),
        };
        return print_json(&output);
    }

    let volume = result.map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
    println!("{} {}", "Blob:".dimmed(), blob);
    println!("{} {}", "Volume:".dimmed(), volume);
    Ok(ExitCode::SUCCESS)
}

/// Run the patch-volume command.
pub fn run_patch(blob: &str, value: f32, gzip: bool, json_output: bool) -> Result<ExitCode> {
    let result = patch_volume(Path::new(blob), Wrapping::from_flag(gzip), value);

    if json_output {
        let output = match result {
            Ok(outcome) => {
                let (previous, patched) = match outcome {
                    PatchOutcome::Unchanged { .. } => (None, false),
                    PatchOutcome::Patched { previous, .. } => (Some(previous), true),
                };
                VolumeOutput {
                    success: true,
                    errors: Vec::new(),
                    blob: blob.to_string(),
                    gzip,
                    volume: Some(value),
                    previous,
                    patched,
                }
            }
            Err(e) => failure_output(blob, gzip, &e),
        };
        return print_json(&output);
    }

    let outcome = result.map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;
    match outcome {
        PatchOutcome::Unchanged { volume } => {
            println!("{} volume already {} in {}", "OK".green(), volume, blob);
        }
        PatchOutcome::Patched { previous, volume } => {
            println!(
                "{} {} -> {} in {}",
                "PATCHED".green().bold(),
                previous,
                volume,
                blob
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn failure_output(blob: &str, gzip: bool, err: &BlobError) -> VolumeOutput {
    VolumeOutput {
        success: false,
        errors: vec![JsonError::new(err.code().to_string(), err.to_string()).with_file(blob)],
        blob: blob.to_string(),
        gzip,
        volume: None,
        previous: None,
        patched: false,
    }
}

fn print_json(output: &VolumeOutput) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
