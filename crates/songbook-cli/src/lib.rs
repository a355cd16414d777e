//! Songbook CLI library.
//!
//! This crate keeps a rhythm-game song library consistent across its three
//! copies: the per-song descriptors on disk, the local tabular export and
//! the remote spreadsheet, which is the source of truth.
//!
//! # Example
//!
//! ```no_run
//! use songbook_cli::config::{CatalogConfig, RunOptions};
//! use songbook_cli::pipeline::run_sync;
//!
//! let config = CatalogConfig::new("songs");
//! let report = run_sync(&config, RunOptions::default(), None).unwrap();
//! for change in &report.rank_changes {
//!     println!("{}: {:?} -> {}", change.id, change.old, change.new);
//! }
//! ```
//!
//! # Modules
//!
//! - [`loaders`]: Disk scan, tabular export and spreadsheet access
//! - [`reconcile`]: Remote-wins merge of the copies
//! - [`order`]: Rank assignment
//! - [`rename`]: Id rename cascade over directories, blobs and manifests
//! - [`blobs`]: Catalog-wide volume patching and gzip unwrapping
//! - [`writers`]: Descriptor, table and sheet writers
//! - [`pipeline`]: The `sync` and `unwrap` batch drivers
//! - [`commands`]: Console and JSON front-ends for each subcommand

pub mod blobs;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod loaders;
pub mod manifest;
pub mod order;
pub mod pipeline;
pub mod reconcile;
pub mod rename;
pub mod report;
pub mod writers;

pub use catalog::Catalog;
pub use config::{CatalogConfig, OrderKey, RunOptions};
pub use error::CatalogError;
pub use pipeline::{run_sync, unwrap_library};
pub use report::{SyncReport, UnwrapReport};
