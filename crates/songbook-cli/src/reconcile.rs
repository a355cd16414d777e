//! Three-way reconciliation of disk and remote copies.
//!
//! The remote copy is the only editable source of truth: when a song exists
//! in both places the remote descriptor replaces the disk one wholesale.
//! Songs found only on disk are imported as they are. Songs found only
//! remotely are never materialized in the catalog.

use std::collections::BTreeMap;

use songbook_schema::Descriptor;

use crate::catalog::Catalog;

/// Result of reconciling one batch.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub catalog: Catalog,
    /// Ids taken from disk because the remote copy lacks them
    pub imported: Vec<String>,
    /// Ids whose disk copy was replaced by the remote copy
    pub replaced: Vec<String>,
    /// Remote records with no directory on disk, in ascending id order
    pub remote_only: BTreeMap<String, Descriptor>,
}

/// Merges the disk and remote copies.
///
/// The disk descriptor's path is carried onto the remote copy that replaces
/// it. All outputs are ordered by id.
pub fn reconcile(
    on_disk: BTreeMap<String, Descriptor>,
    mut remote: BTreeMap<String, Descriptor>,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    for (id, mut disk) in on_disk {
        match remote.remove(&id) {
            Some(mut winner) => {
                if let Some(path) = disk.take_path() {
                    winner.set_path(path);
                }
                result.catalog.insert(id.clone(), winner);
                result.replaced.push(id);
            }
            None => {
                result.catalog.insert(id.clone(), disk);
                result.imported.push(id);
            }
        }
    }

    result.remote_only = remote;
    result
}
