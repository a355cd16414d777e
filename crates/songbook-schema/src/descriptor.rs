//! Nested per-song descriptors.
//!
//! A descriptor is the on-disk `data.json` body of one song: a JSON object
//! whose values are scalars or one level of groups holding scalars. The
//! descriptor may remember the file it was read from; that path is metadata
//! only and takes no part in serialization or equality.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::DescriptorError;
use crate::schema::{fields, Schema, SEPARATOR};
use crate::value::FieldValue;

/// Byte order mark written in front of descriptor and table files.
pub const BOM: char = '\u{feff}';

/// Legacy top-level key holding a self path, dropped on read.
const LEGACY_PATH_KEY: &str = "path";

/// A top-level descriptor entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(FieldValue),
    Group(BTreeMap<String, FieldValue>),
}

/// One song's nested metadata.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    nodes: BTreeMap<String, Node>,
    path: Option<PathBuf>,
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Descriptor {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a descriptor holding only a song id.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut descriptor = Self::new();
        descriptor.insert_node(fields::ID, Node::Scalar(FieldValue::Str(id.into())));
        descriptor
    }

    /// Parses a descriptor body.
    ///
    /// A leading BOM is skipped. Null values are dropped so that they are
    /// defaulted like absent fields. Arrays and objects below the first
    /// level are rejected.
    pub fn from_json_str(text: &str) -> Result<Self, DescriptorError> {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        if text.trim().is_empty() {
            return Err(DescriptorError::Empty);
        }

        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(DescriptorError::NotAnObject);
        };

        let mut descriptor = Self::new();
        for (key, value) in map {
            match value {
                Value::String(_) if key == LEGACY_PATH_KEY => {}
                Value::Null => {}
                Value::Array(_) => return Err(DescriptorError::TooDeep(key)),
                Value::Object(children) => {
                    let mut group = BTreeMap::new();
                    for (inner, child) in children {
                        match child {
                            Value::Null => {}
                            Value::Array(_) | Value::Object(_) => {
                                return Err(DescriptorError::TooDeep(format!(
                                    "{}{}{}",
                                    key, SEPARATOR, inner
                                )));
                            }
                            scalar => {
                                if let Some(v) = FieldValue::from_json(&scalar) {
                                    group.insert(inner, v);
                                }
                            }
                        }
                    }
                    descriptor.nodes.insert(key, Node::Group(group));
                }
                scalar => {
                    if let Some(v) = FieldValue::from_json(&scalar) {
                        descriptor.nodes.insert(key, Node::Scalar(v));
                    }
                }
            }
        }

        Ok(descriptor)
    }

    /// Serializes the descriptor as tab-indented JSON with keys in registry
    /// order. Keys unknown to the registry follow in lexicographic order.
    /// Non-ASCII text is written unescaped. No BOM is prepended.
    pub fn to_json_string(&self, schema: &Schema) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.ordered(schema).serialize(&mut ser)?;
        // serde_json only emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// A view that serializes in registry order.
    pub fn ordered<'a>(&'a self, schema: &'a Schema) -> Ordered<'a> {
        Ordered {
            descriptor: self,
            schema,
        }
    }

    /// The song id, when present as a string.
    pub fn id(&self) -> Option<&str> {
        self.get(fields::ID).and_then(FieldValue::as_str)
    }

    /// The file this descriptor was read from or will be written to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn take_path(&mut self) -> Option<PathBuf> {
        self.path.take()
    }

    /// Returns the directory holding the descriptor file.
    pub fn dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Looks up a value by flat key.
    pub fn get(&self, flat: &str) -> Option<&FieldValue> {
        if let Some(Node::Scalar(v)) = self.nodes.get(flat) {
            return Some(v);
        }
        let (outer, inner) = flat.split_once(SEPARATOR)?;
        match self.nodes.get(outer) {
            Some(Node::Group(group)) => group.get(inner),
            _ => None,
        }
    }

    /// Sets a value by flat key.
    ///
    /// An existing top-level scalar of that exact name is overwritten.
    /// Otherwise a key containing the separator goes into its group.
    pub fn set(&mut self, flat: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        if let Some(Node::Scalar(slot)) = self.nodes.get_mut(flat) {
            *slot = value;
            return;
        }
        match flat.split_once(SEPARATOR) {
            Some((outer, inner)) => {
                let node = self
                    .nodes
                    .entry(outer.to_string())
                    .or_insert_with(|| Node::Group(BTreeMap::new()));
                match node {
                    Node::Group(group) => {
                        group.insert(inner.to_string(), value);
                    }
                    Node::Scalar(_) => {
                        let mut group = BTreeMap::new();
                        group.insert(inner.to_string(), value);
                        *node = Node::Group(group);
                    }
                }
            }
            None => {
                self.nodes.insert(flat.to_string(), Node::Scalar(value));
            }
        }
    }

    /// Removes a value by flat key. Groups left empty are removed too.
    pub fn remove(&mut self, flat: &str) -> Option<FieldValue> {
        if let Some(Node::Scalar(_)) = self.nodes.get(flat) {
            return match self.nodes.remove(flat) {
                Some(Node::Scalar(v)) => Some(v),
                _ => None,
            };
        }
        let (outer, inner) = flat.split_once(SEPARATOR)?;
        let Some(Node::Group(group)) = self.nodes.get_mut(outer) else {
            return None;
        };
        let removed = group.remove(inner);
        if group.is_empty() {
            self.nodes.remove(outer);
        }
        removed
    }

    /// Inserts a top-level node, replacing any previous node of that name.
    pub fn insert_node(&mut self, key: impl Into<String>, node: Node) {
        self.nodes.insert(key.into(), node);
    }

    /// Top-level nodes in key order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Registry-ordered serialization of a descriptor.
pub struct Ordered<'a> {
    descriptor: &'a Descriptor,
    schema: &'a Schema,
}

impl Serialize for Ordered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let schema = self.schema;
        let mut outer: Vec<(&String, &Node)> = self.descriptor.nodes.iter().collect();
        outer.sort_by_key(|(key, _)| (schema.outer_rank(key).unwrap_or(usize::MAX), *key));

        let mut map = serializer.serialize_map(Some(outer.len()))?;
        for (key, node) in outer {
            match node {
                Node::Scalar(v) => map.serialize_entry(key, &v.to_json())?,
                Node::Group(group) => map.serialize_entry(
                    key,
                    &OrderedGroup {
                        outer: key,
                        group,
                        schema,
                    },
                )?,
            }
        }
        map.end()
    }
}

struct OrderedGroup<'a> {
    outer: &'a str,
    group: &'a BTreeMap<String, FieldValue>,
    schema: &'a Schema,
}

impl Serialize for OrderedGroup<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut inner: Vec<(usize, &String, &FieldValue)> = self
            .group
            .iter()
            .map(|(k, v)| {
                let flat = format!("{}{}{}", self.outer, SEPARATOR, k);
                (self.schema.position(&flat).unwrap_or(usize::MAX), k, v)
            })
            .collect();
        inner.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut map = serializer.serialize_map(Some(inner.len()))?;
        for (_, key, value) in inner {
            map.serialize_entry(key, &value.to_json())?;
        }
        map.end()
    }
}
