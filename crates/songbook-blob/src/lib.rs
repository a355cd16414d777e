//! Songbook Blob Library
//!
//! This crate patches the embedded volume field of song blobs in place and
//! maintains their gzip wrapping.
//!
//! # Overview
//!
//! Song blobs are opaque binary payloads, optionally gzip-wrapped. The only
//! field ever modified is the big-endian `f32` volume at [`VOLUME_OFFSET`].
//! Every write goes through an atomic replace in the blob's directory.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use songbook_blob::{patch_volume, PatchOutcome, Wrapping};
//!
//! let blob = Path::new("songs/abc/song_abc.bin");
//! match patch_volume(blob, Wrapping::Gzip, 1.25).unwrap() {
//!     PatchOutcome::Unchanged { .. } => println!("already at 1.25"),
//!     PatchOutcome::Patched { previous, .. } => println!("patched from {}", previous),
//! }
//! ```
//!
//! # Modules
//!
//! - [`patch`]: Volume read/patch/verify and in-place gzip maintenance
//! - [`codec`]: Gzip wrapping and the [`Wrapping`] state
//! - [`naming`]: Blob file naming conventions
//! - [`atomic`]: Temp-file-and-rename replacement
//! - [`error`]: Error types

pub mod atomic;
pub mod codec;
pub mod error;
pub mod naming;
pub mod patch;

pub use atomic::replace_file;
pub use codec::{gunzip, gzip, is_gzip, Wrapping, GZIP_MAGIC};
pub use error::BlobError;
pub use naming::{
    blob_files, is_blob_of, parse_chart_blob, parse_song_blob, song_blob_name, song_blob_path,
    ChartBlob,
};
pub use patch::{
    patch_volume, preview_patch, preview_unwrap, read_volume, set_volume_at, unwrap_file,
    volume_at, wrap_file,
    PatchOutcome, RewrapOutcome, MIN_BLOB_LEN, VOLUME_LEN, VOLUME_OFFSET,
};
