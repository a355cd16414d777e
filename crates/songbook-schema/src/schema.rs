//! The schema registry.
//!
//! The registry is an ordered table of `(name, type)` entries. Its order is
//! the column order of the tabular export and the key order of serialized
//! descriptors. Names of the form `outer_inner` live in a group of the
//! nested descriptor; the split is computed once when the registry is built.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::SchemaError;
use crate::value::{FieldType, FieldValue};

/// Separator between the outer and inner part of a namespaced field.
pub const SEPARATOR: char = '_';

/// Flat keys the pipeline addresses directly.
pub mod fields {
    pub const ID: &str = "id";
    pub const RENAME_TO: &str = "id-new";
    pub const GENRE: &str = "genreNo";
    pub const TITLE: &str = "songName_text";
    pub const STAR_MAX: &str = "starMax";
    pub const VOLUME: &str = "volume";
    pub const ORDER: &str = "order";
    pub const HIGH_SCORE: &str = "highScore";
    pub const GZIPPED: &str = "areFilesGZipped";
    pub const SONG_FILE_NAME: &str = "songFileName";
}

/// One registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }

    /// The value inserted when the field is absent.
    pub fn default_value(&self) -> FieldValue {
        self.ty.zero_value()
    }
}

/// Placement of a flat key inside the nested descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    pub flat: &'static str,
    pub outer: &'static str,
    pub inner: Option<&'static str>,
}

impl FieldKey {
    fn parse(name: &'static str) -> Result<Self, SchemaError> {
        match name.split_once(SEPARATOR) {
            None if name.is_empty() => Err(SchemaError::InvalidFieldName(name.to_string())),
            None => Ok(Self {
                flat: name,
                outer: name,
                inner: None,
            }),
            Some((outer, inner)) => {
                if outer.is_empty() || inner.is_empty() || inner.contains(SEPARATOR) {
                    return Err(SchemaError::InvalidFieldName(name.to_string()));
                }
                Ok(Self {
                    flat: name,
                    outer,
                    inner: Some(inner),
                })
            }
        }
    }
}

use FieldType::{Bool, Float, Int, Str};

/// The standard song catalog registry.
pub const STANDARD_FIELDS: &[FieldSpec] = &[
    // Fields edited by hand in the spreadsheet
    FieldSpec::new("id", Str),
    FieldSpec::new("id-new", Str),
    FieldSpec::new("genreNo", Int),
    FieldSpec::new("favorite", Bool),
    FieldSpec::new("songName_text", Str),
    FieldSpec::new("songDetail_text", Str),
    FieldSpec::new("songSubtitle_text", Str),
    // Catalog-maintained fields
    FieldSpec::new("starMax", Int),
    FieldSpec::new("date", Str),
    FieldSpec::new("debut", Str),
    FieldSpec::new("volume", Float),
    FieldSpec::new("replaygain", Float),
    FieldSpec::new("order", Int),
    FieldSpec::new("highScore", Int),
    // Per-difficulty chart metadata
    FieldSpec::new("starEasy", Int),
    FieldSpec::new("starNormal", Int),
    FieldSpec::new("starHard", Int),
    FieldSpec::new("starMania", Int),
    FieldSpec::new("starUra", Int),
    FieldSpec::new("shinutiEasy", Int),
    FieldSpec::new("shinutiNormal", Int),
    FieldSpec::new("shinutiHard", Int),
    FieldSpec::new("shinutiMania", Int),
    FieldSpec::new("shinutiUra", Int),
    FieldSpec::new("shinutiEasyDuet", Int),
    FieldSpec::new("shinutiNormalDuet", Int),
    FieldSpec::new("shinutiHardDuet", Int),
    FieldSpec::new("shinutiManiaDuet", Int),
    FieldSpec::new("shinutiUraDuet", Int),
    FieldSpec::new("scoreEasy", Int),
    FieldSpec::new("scoreNormal", Int),
    FieldSpec::new("scoreHard", Int),
    FieldSpec::new("scoreMania", Int),
    FieldSpec::new("scoreUra", Int),
    FieldSpec::new("branchEasy", Bool),
    FieldSpec::new("branchNormal", Bool),
    FieldSpec::new("branchHard", Bool),
    FieldSpec::new("branchMania", Bool),
    FieldSpec::new("branchUra", Bool),
    // Fonts
    FieldSpec::new("songName_font", Int),
    FieldSpec::new("songDetail_font", Int),
    FieldSpec::new("songSubtitle_font", Int),
    // File data
    FieldSpec::new("previewPos", Int),
    FieldSpec::new("fumenOffsetPos", Int),
    FieldSpec::new("tjaFileHash", Str),
    FieldSpec::new("areFilesGZipped", Bool),
    FieldSpec::new("uniqueId", Str),
    FieldSpec::new("songFileName", Str),
];

/// An ordered, validated field registry with its derived layout table.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    layout: Vec<FieldKey>,
    index: HashMap<&'static str, usize>,
    outer_rank: HashMap<&'static str, usize>,
}

impl Schema {
    /// Builds a registry, rejecting duplicate names and names nested deeper
    /// than one level.
    pub fn new(fields: &[FieldSpec]) -> Result<Self, SchemaError> {
        let mut layout = Vec::with_capacity(fields.len());
        let mut index = HashMap::with_capacity(fields.len());
        let mut outer_rank = HashMap::new();

        for (position, spec) in fields.iter().enumerate() {
            if index.insert(spec.name, position).is_some() {
                return Err(SchemaError::DuplicateField(spec.name.to_string()));
            }
            let key = FieldKey::parse(spec.name)?;
            let next_rank = outer_rank.len();
            outer_rank.entry(key.outer).or_insert(next_rank);
            layout.push(key);
        }

        Ok(Self {
            fields: fields.to_vec(),
            layout,
            index,
            outer_rank,
        })
    }

    /// The standard registry, built once.
    pub fn standard() -> &'static Schema {
        static STANDARD: OnceLock<Schema> = OnceLock::new();
        STANDARD.get_or_init(|| {
            Schema::new(STANDARD_FIELDS).expect("standard field table is well-formed")
        })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registry position of a flat key.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Nested placement of a known flat key.
    pub fn key(&self, name: &str) -> Option<&FieldKey> {
        self.index.get(name).map(|&i| &self.layout[i])
    }

    /// Rank of a top-level descriptor key, by first appearance in the registry.
    pub fn outer_rank(&self, outer: &str) -> Option<usize> {
        self.outer_rank.get(outer).copied()
    }
}
