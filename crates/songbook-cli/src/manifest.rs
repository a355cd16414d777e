//! Conversion manifests.
//!
//! The chart converter leaves a `conversion.json` next to the song
//! directories it produced. The file is UTF-16LE JSON of the form
//! `{"i":[{"f":".\\<dir>","a":1,"s":true,"v":2,"e":0}]}`; only the `f` path
//! references are ever rewritten, every other key is kept.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use songbook_blob::replace_file;

use crate::error::ManifestError;

const UTF16LE_BOM: [u8; 2] = [0xff, 0xfe];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ManifestBody {
    i: Vec<ManifestEntry>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ManifestEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    f: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// A conversion manifest loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    body: ManifestBody,
}

impl Manifest {
    /// Creates the manifest the converter writes for a single song directory.
    pub fn for_dir(path: impl Into<PathBuf>, dir_name: &str) -> Self {
        let mut rest = Map::new();
        rest.insert("a".to_string(), Value::from(1));
        rest.insert("s".to_string(), Value::from(true));
        rest.insert("v".to_string(), Value::from(2));
        rest.insert("e".to_string(), Value::from(0));
        Self {
            path: path.into(),
            body: ManifestBody {
                i: vec![ManifestEntry {
                    f: Some(format!(".\\{}", dir_name)),
                    rest,
                }],
                extra: Map::new(),
            },
        }
    }

    /// Reads and decodes a manifest file.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = decode_utf16le(&bytes).ok_or_else(|| ManifestError::Encoding(path.to_path_buf()))?;
        let body = serde_json::from_str(&text).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            body,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All `f` path references.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.body.i.iter().filter_map(|e| e.f.as_deref())
    }

    /// Points references whose final component is `old_dir` at `new_dir`.
    /// Returns the number of references changed.
    pub fn rewrite_dir(&mut self, old_dir: &str, new_dir: &str) -> usize {
        let mut changed = 0;
        for entry in &mut self.body.i {
            let Some(reference) = entry.f.as_mut() else {
                continue;
            };
            let start = reference.rfind(['\\', '/']).map(|i| i + 1).unwrap_or(0);
            if &reference[start..] == old_dir {
                reference.replace_range(start.., new_dir);
                changed += 1;
            }
        }
        changed
    }

    /// Encodes the manifest as compact UTF-16LE JSON without a BOM.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let text = serde_json::to_string(&self.body).map_err(|source| ManifestError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(encode_utf16le(&text))
    }

    /// Atomically writes the manifest back to its path.
    pub fn write(&self) -> Result<(), ManifestError> {
        let bytes = self.to_bytes()?;
        replace_file(&self.path, &bytes).map_err(|source| ManifestError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Encodes text as UTF-16LE.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Decodes UTF-16LE bytes, skipping a leading BOM.
pub fn decode_utf16le(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(&UTF16LE_BOM).unwrap_or(bytes);
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
