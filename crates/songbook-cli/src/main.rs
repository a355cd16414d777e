//! Songbook CLI - Command-line interface for song catalog reconciliation
//!
//! This binary provides commands for syncing a song library with its
//! tabular and spreadsheet copies and for maintaining song blobs.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use songbook_cli::commands;
use songbook_cli::commands::sync::SyncArgs;
use songbook_cli::commands::unwrap::UnwrapArgs;
use songbook_cli::OrderKey;

/// Songbook - Song Catalog Reconciliation
#[derive(Parser)]
#[command(name = "songbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile song descriptors with the remote copy and write every copy back
    Sync {
        /// Songs directory to scan
        #[arg(long)]
        songs_dir: String,

        /// Path to config file (JSON)
        #[arg(long)]
        config: Option<String>,

        /// Path to the tabular export (default: metadata.csv)
        #[arg(long)]
        tabular: Option<String>,

        /// Path to the spreadsheet snapshot; takes precedence over the tabular export
        #[arg(long)]
        sheet: Option<String>,

        /// Ordering key for rank assignment
        #[arg(long)]
        order_by: Option<OrderKey>,

        /// Patch non-zero volumes into song blobs
        #[arg(long)]
        patch_volume: bool,

        /// Publish the reconciled table back to the spreadsheet
        #[arg(long)]
        write_sheet: bool,

        /// Plan every stage without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the volume stored in a song blob
    ReadVolume {
        /// Path to the blob
        #[arg(long)]
        blob: String,

        /// The blob is gzip-wrapped
        #[arg(long)]
        gzip: bool,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Write a volume into a song blob
    PatchVolume {
        /// Path to the blob
        #[arg(long)]
        blob: String,

        /// Volume to write
        #[arg(long, allow_negative_numbers = true)]
        value: f32,

        /// The blob is gzip-wrapped
        #[arg(long)]
        gzip: bool,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Decompress gzip-wrapped blobs and clear the flag in their descriptors
    Unwrap {
        /// Songs directory to scan
        #[arg(long)]
        songs_dir: String,

        /// Path to config file (JSON)
        #[arg(long)]
        config: Option<String>,

        /// Path to the tabular export (default: metadata.csv)
        #[arg(long)]
        tabular: Option<String>,

        /// Path to the spreadsheet snapshot to clear the flag in as well
        #[arg(long)]
        sheet: Option<String>,

        /// Report what would be decompressed without writing
        #[arg(long)]
        dry_run: bool,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync {
            songs_dir,
            config,
            tabular,
            sheet,
            order_by,
            patch_volume,
            write_sheet,
            dry_run,
            json,
        } => commands::sync::run(
            SyncArgs {
                songs_dir: &songs_dir,
                config: config.as_deref(),
                tabular: tabular.as_deref(),
                sheet: sheet.as_deref(),
                order_by,
                patch_volume,
                write_sheet,
                dry_run,
            },
            json,
        ),
        Commands::ReadVolume { blob, gzip, json } => commands::volume::run_read(&blob, gzip, json),
        Commands::PatchVolume {
            blob,
            value,
            gzip,
            json,
        } => commands::volume::run_patch(&blob, value, gzip, json),
        Commands::Unwrap {
            songs_dir,
            config,
            tabular,
            sheet,
            dry_run,
            json,
        } => commands::unwrap::run(
            UnwrapArgs {
                songs_dir: &songs_dir,
                config: config.as_deref(),
                tabular: tabular.as_deref(),
                sheet: sheet.as_deref(),
                dry_run,
            },
            json,
        ),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
