//! Schema defaulting and type conforming of flat records.
//!
//! Every function here mutates the record in place and returns the
//! diagnostics it produced. None of them fail: the only structural error,
//! a key set that differs from the registry, is reported by
//! [`check_complete`].

use crate::difficulty::Difficulty;
use crate::error::{Diagnostic, DiagnosticCode, SchemaError};
use crate::flat::FlatRecord;
use crate::schema::{fields, Schema};
use crate::value::{Coercion, FieldValue};

/// Inserts the zero value for every registry field absent from `flat`.
///
/// `starMax` is derived from the star ratings instead of defaulted.
/// Running it twice yields no further changes.
pub fn apply_defaults(schema: &Schema, flat: &mut FlatRecord) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let id = flat.id().to_string();
    let mut derive_star_max = false;

    for spec in schema.fields() {
        if flat.contains_key(spec.name) {
            continue;
        }
        if spec.name == fields::STAR_MAX {
            derive_star_max = true;
            continue;
        }
        flat.insert(spec.name, spec.default_value());
        diagnostics.push(Diagnostic::with_field(
            DiagnosticCode::MissingField,
            &id,
            spec.name,
            format!("field missing, defaulted to {:?}", spec.default_value().to_cell()),
        ));
    }

    if derive_star_max {
        let max = star_max(flat);
        flat.insert(fields::STAR_MAX, max);
        diagnostics.push(Diagnostic::with_field(
            DiagnosticCode::MissingField,
            &id,
            fields::STAR_MAX,
            format!("field missing, derived from star ratings as {}", max),
        ));
    }

    diagnostics
}

/// Recomputes `starMax` from the five star ratings.
///
/// A stored value that disagrees is replaced and reported.
pub fn recompute_star_max(schema: &Schema, flat: &mut FlatRecord) -> Vec<Diagnostic> {
    if !schema.contains(fields::STAR_MAX) {
        return Vec::new();
    }

    let computed = star_max(flat);
    match flat.get(fields::STAR_MAX).and_then(FieldValue::as_int) {
        Some(stored) if stored == computed => Vec::new(),
        Some(stored) => {
            flat.insert(fields::STAR_MAX, computed);
            vec![Diagnostic::with_field(
                DiagnosticCode::DerivedFieldUpdated,
                flat.id(),
                fields::STAR_MAX,
                format!("updated from {} to {}", stored, computed),
            )]
        }
        None => {
            flat.insert(fields::STAR_MAX, computed);
            Vec::new()
        }
    }
}

/// Coerces known fields to their registry types, then applies defaults and
/// recomputes `starMax`. Unknown keys are left for [`check_complete`].
pub fn conform(schema: &Schema, flat: &mut FlatRecord) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let id = flat.id().to_string();

    let keys: Vec<String> = flat.keys().map(str::to_string).collect();
    for key in keys {
        let Some(spec) = schema.field(&key) else {
            continue;
        };
        let Some(value) = flat.get(&key) else {
            continue;
        };

        match value.coerce_to(spec.ty) {
            Coercion::Exact(v) => {
                flat.insert(key, v);
            }
            Coercion::Coerced(v) => {
                diagnostics.push(Diagnostic::with_field(
                    DiagnosticCode::CoercedValue,
                    &id,
                    &key,
                    format!("{} value {:?} converted to {}", value.field_type(), value.to_cell(), spec.ty),
                ));
                flat.insert(key, v);
            }
            Coercion::Invalid => {
                diagnostics.push(Diagnostic::with_field(
                    DiagnosticCode::InvalidValue,
                    &id,
                    &key,
                    format!("{:?} is not a valid {}, defaulted", value.to_cell(), spec.ty),
                ));
                flat.insert(key, spec.default_value());
            }
        }
    }

    diagnostics.extend(apply_defaults(schema, flat));
    diagnostics.extend(recompute_star_max(schema, flat));
    diagnostics
}

/// Checks that the record's key set equals the registry's field set.
pub fn check_complete(schema: &Schema, flat: &FlatRecord) -> Result<(), SchemaError> {
    let missing: Vec<String> = schema
        .names()
        .filter(|name| !flat.contains_key(name))
        .map(str::to_string)
        .collect();
    let unexpected: Vec<String> = flat
        .keys()
        .filter(|key| !schema.contains(key))
        .map(str::to_string)
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::FieldMismatch {
            id: flat.id().to_string(),
            missing,
            unexpected,
        })
    }
}

fn star_max(flat: &FlatRecord) -> i64 {
    Difficulty::ALL
        .iter()
        .filter_map(|d| flat.get(d.star_field()).and_then(FieldValue::as_int))
        .max()
        .unwrap_or(0)
}
