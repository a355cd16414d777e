//! Order assignment.
//!
//! Every canonical record gets a dense 0-based rank in its `order` field.
//! Ranks follow a composite sort key selected by [`OrderKey`]; the song id
//! is always the final tie-break so the ordering is total.

use std::cmp::Ordering;

use songbook_schema::{fields, Descriptor, FieldValue};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::catalog::Catalog;
use crate::config::OrderKey;
use crate::report::RankChange;

/// Folds a display title for sorting: canonical decomposition, combining
/// marks removed, upper-cased.
pub fn fold_title(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// The fields a sort key is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortFields<'a> {
    id: &'a str,
    genre: i64,
    star_max: i64,
    high_score: i64,
    title: String,
}

impl<'a> SortFields<'a> {
    fn new(id: &'a str, descriptor: &Descriptor) -> Self {
        let int = |key: &str| descriptor.get(key).and_then(FieldValue::as_int).unwrap_or(0);
        Self {
            id,
            genre: int(fields::GENRE),
            star_max: int(fields::STAR_MAX),
            high_score: int(fields::HIGH_SCORE),
            title: fold_title(
                descriptor
                    .get(fields::TITLE)
                    .and_then(FieldValue::as_str)
                    .unwrap_or_default(),
            ),
        }
    }

    fn compare(&self, other: &Self, key: OrderKey) -> Ordering {
        let ordering = match key {
            OrderKey::Full => self
                .genre
                .cmp(&other.genre)
                .then_with(|| (other.high_score > 0).cmp(&(self.high_score > 0)))
                .then_with(|| other.star_max.cmp(&self.star_max))
                .then_with(|| other.high_score.cmp(&self.high_score))
                .then_with(|| self.title.cmp(&other.title)),
            OrderKey::GenreStars => self
                .genre
                .cmp(&other.genre)
                .then_with(|| other.star_max.cmp(&self.star_max))
                .then_with(|| self.title.cmp(&other.title)),
            OrderKey::Title => self.title.cmp(&other.title),
        };
        ordering.then_with(|| self.id.cmp(other.id))
    }
}

/// Ranks every record and writes the rank into `order`.
///
/// Returns one change per record whose previous rank differs, in new rank
/// order. Running it again on unchanged input returns nothing.
pub fn assign_order(catalog: &mut Catalog, key: OrderKey) -> Vec<RankChange> {
    let ranked: Vec<String> = {
        let mut entries: Vec<SortFields<'_>> = catalog
            .iter()
            .map(|(id, descriptor)| SortFields::new(id, descriptor))
            .collect();
        entries.sort_by(|a, b| a.compare(b, key));
        entries.into_iter().map(|e| e.id.to_string()).collect()
    };

    let mut changes = Vec::new();
    for (rank, id) in ranked.into_iter().enumerate() {
        let rank = rank as i64;
        let Some(descriptor) = catalog.get_mut(&id) else {
            continue;
        };
        let old = descriptor.get(fields::ORDER).and_then(FieldValue::as_int);
        if old == Some(rank) {
            continue;
        }
        descriptor.set(fields::ORDER, rank);
        let title = descriptor
            .get(fields::TITLE)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_string();
        changes.push(RankChange {
            id,
            title,
            old,
            new: rank,
        });
    }
    changes
}
