//! The canonical set of reconciled descriptors.

use std::collections::BTreeMap;

use songbook_schema::{conform, flatten, unflatten, Descriptor, Diagnostic, FlatRecord, Schema};

/// Reconciled descriptors keyed by song id, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: BTreeMap<String, Descriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, descriptor: Descriptor) -> Option<Descriptor> {
        self.records.insert(id.into(), descriptor)
    }

    pub fn get(&self, id: &str) -> Option<&Descriptor> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Descriptor> {
        self.records.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Descriptor> {
        self.records.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Descriptor)> {
        self.records.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flat records in ascending id order.
    pub fn flat_records(&self) -> Vec<FlatRecord> {
        self.records.values().map(flatten).collect()
    }
}

impl FromIterator<(String, Descriptor)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, Descriptor)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Conforms a descriptor to the registry, keeping its path.
pub fn normalize(schema: &Schema, descriptor: &Descriptor) -> (Descriptor, Vec<Diagnostic>) {
    let mut flat = flatten(descriptor);
    let diagnostics = conform(schema, &mut flat);
    let mut normalized = unflatten(&flat, schema);
    if let Some(path) = descriptor.path() {
        normalized.set_path(path);
    }
    (normalized, diagnostics)
}
