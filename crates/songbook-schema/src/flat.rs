//! Flat records and the flatten/unflatten transform.

use std::collections::BTreeMap;

use crate::descriptor::{Descriptor, Node};
use crate::schema::{fields, Schema, SEPARATOR};
use crate::value::FieldValue;

/// A single-level mapping from `outer_inner` keys to scalar values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord(BTreeMap<String, FieldValue>);

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The song id, or an empty string when absent.
    pub fn id(&self) -> &str {
        self.0
            .get(fields::ID)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
    }

    /// Table cells in registry order; absent fields yield empty cells.
    pub fn cells(&self, schema: &Schema) -> Vec<String> {
        schema
            .names()
            .map(|name| self.0.get(name).map(FieldValue::to_cell).unwrap_or_default())
            .collect()
    }
}

impl FromIterator<(String, FieldValue)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Flattens a descriptor: each group child becomes `outer_inner`, top-level
/// scalars pass through. No schema lookup and no defaulting.
pub fn flatten(descriptor: &Descriptor) -> FlatRecord {
    let mut flat = FlatRecord::new();
    for (key, node) in descriptor.nodes() {
        match node {
            Node::Scalar(v) => {
                flat.insert(key, v.clone());
            }
            Node::Group(group) => {
                for (inner, v) in group {
                    flat.insert(format!("{}{}{}", key, SEPARATOR, inner), v.clone());
                }
            }
        }
    }
    flat
}

/// Rebuilds a descriptor from a flat record.
///
/// Registry keys are placed with the precomputed layout; other keys holding
/// the separator are split once; the rest stay top-level.
pub fn unflatten(flat: &FlatRecord, schema: &Schema) -> Descriptor {
    let mut nodes: BTreeMap<String, Node> = BTreeMap::new();

    for (key, value) in flat.iter() {
        let placement = match schema.key(key) {
            Some(layout) => layout.inner.map(|inner| (layout.outer, inner)),
            None => key.split_once(SEPARATOR),
        };

        match placement {
            Some((outer, inner)) => {
                let node = nodes
                    .entry(outer.to_string())
                    .or_insert_with(|| Node::Group(BTreeMap::new()));
                if let Node::Group(group) = node {
                    group.insert(inner.to_string(), value.clone());
                }
            }
            None => {
                nodes.insert(key.to_string(), Node::Scalar(value.clone()));
            }
        }
    }

    let mut descriptor = Descriptor::new();
    for (key, node) in nodes {
        descriptor.insert_node(key, node);
    }
    descriptor
}
