//! Songbook Schema Library
//!
//! This crate provides the field registry, song descriptors, flat records and
//! the transforms between them for the songbook catalog.
//!
//! # Overview
//!
//! Each song's metadata exists as a nested descriptor on disk (`data.json`)
//! and as a flat row in tabular exports. The [`Schema`] registry fixes the
//! field set, the field types and their order:
//!
//! - **Descriptor**: nested JSON object, at most two levels deep
//! - **Flat record**: single-level map keyed by `outer_inner` names
//! - **Conforming**: coercion to registry types, defaulting and derived fields
//!
//! # Example
//!
//! ```
//! use songbook_schema::{conform, flatten, unflatten, Descriptor, Schema};
//!
//! let schema = Schema::standard();
//! let descriptor = Descriptor::from_json_str(r#"{"id": "abc", "songName": {"text": "Song"}}"#).unwrap();
//!
//! let mut flat = flatten(&descriptor);
//! assert_eq!(flat.get("songName_text").and_then(|v| v.as_str()), Some("Song"));
//!
//! let diagnostics = conform(schema, &mut flat);
//! assert!(!diagnostics.is_empty());
//! assert_eq!(flat.len(), schema.len());
//!
//! let restored = unflatten(&flat, schema);
//! assert_eq!(restored.id(), Some("abc"));
//! ```
//!
//! # Modules
//!
//! - [`schema`]: The field registry and its layout table
//! - [`value`]: Typed scalar values and coercion
//! - [`descriptor`]: Nested descriptors and registry-ordered serialization
//! - [`flat`]: Flat records and flatten/unflatten
//! - [`conform`]: Defaulting, coercion and completeness checks
//! - [`difficulty`]: The five chart difficulties
//! - [`error`]: Error types and diagnostic codes

pub mod conform;
pub mod descriptor;
pub mod difficulty;
pub mod error;
pub mod flat;
pub mod schema;
pub mod value;

// Re-export commonly used types at the crate root
pub use conform::{apply_defaults, check_complete, conform, recompute_star_max};
pub use descriptor::{Descriptor, Node, BOM};
pub use difficulty::Difficulty;
pub use error::{DescriptorError, Diagnostic, DiagnosticCode, SchemaError};
pub use flat::{flatten, unflatten, FlatRecord};
pub use schema::{fields, FieldKey, FieldSpec, Schema, SEPARATOR, STANDARD_FIELDS};
pub use value::{parse_bool_token, Coercion, FieldType, FieldValue};
