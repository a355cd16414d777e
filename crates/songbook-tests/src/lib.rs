//! Songbook End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the catalog flows:
//!
//! - Sync: disk and remote copies -> reconciled descriptors and tables
//! - Rename: pending id changes -> renamed directories, files and manifests
//! - Volume: descriptor volumes -> patched song blobs
//! - Unwrap: gzip-flagged songs -> raw blobs and cleared flags
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p songbook-tests
//! ```
//!
//! ## Fixtures
//!
//! [`fixtures::LibraryFixture`] builds a throwaway song library in a
//! temporary directory:
//!
//! ```rust,ignore
//! use songbook_tests::fixtures::LibraryFixture;
//!
//! let library = LibraryFixture::new();
//! library.add_song("abc", r#"{"id":"abc","genreNo":1}"#);
//! library.add_blob("abc", 0.0, false);
//! let report = songbook_cli::run_sync(&library.config(), Default::default(), None).unwrap();
//! ```

pub mod fixtures;
