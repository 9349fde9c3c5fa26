//! Reconciles partial records from several sources into one record.
//!
//! Partials are ordered by source priority before folding, never by the
//! order in which the network calls completed. List fields concatenate in
//! that order; scalar fields are last-writer-wins.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::record::{FieldKind, FieldRecord, FieldValue};
use crate::sources::SourceId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error(
        "Field '{field}' is a {first_kind:?} in '{first_source}' but a {second_kind:?} in '{second_source}'"
    )]
    TypeMismatch {
        field: String,
        first_source: SourceId,
        first_kind: FieldKind,
        second_source: SourceId,
        second_kind: FieldKind,
    },
}

/// Merges partial records in the given source priority order.
///
/// Sources missing from `priority` are placed after all listed sources,
/// ordered by id, so the result never depends on input order.
pub fn merge(
    partials: &[(SourceId, FieldRecord)],
    priority: &[SourceId],
) -> Result<FieldRecord, ReconciliationError> {
    let mut ordered: Vec<&(SourceId, FieldRecord)> = partials.iter().collect();
    ordered.sort_by(|(a, _), (b, _)| {
        rank(a, priority)
            .cmp(&rank(b, priority))
            .then_with(|| a.cmp(b))
    });

    // Remembers which source first defined each field, for error reporting.
    let mut origin: BTreeMap<String, SourceId> = BTreeMap::new();
    let mut merged = FieldRecord::new();

    for (source, record) in ordered {
        for (name, value) in record.iter() {
            match merged.get_mut(name) {
                None => {
                    origin.insert(name.clone(), source.clone());
                    merged.insert(name.clone(), value.clone());
                }
                Some(FieldValue::List(existing)) => match value {
                    FieldValue::List(items) => existing.extend(items.iter().cloned()),
                    FieldValue::Scalar(_) => {
                        return Err(mismatch(name, &origin, FieldKind::List, source, value))
                    }
                },
                Some(existing @ FieldValue::Scalar(_)) => match value {
                    FieldValue::Scalar(_) => *existing = value.clone(),
                    FieldValue::List(_) => {
                        return Err(mismatch(name, &origin, FieldKind::Scalar, source, value))
                    }
                },
            }
        }
    }

    Ok(merged)
}

fn rank(source: &SourceId, priority: &[SourceId]) -> usize {
    priority
        .iter()
        .position(|p| p == source)
        .unwrap_or(priority.len())
}

fn mismatch(
    field: &str,
    origin: &BTreeMap<String, SourceId>,
    first_kind: FieldKind,
    second_source: &SourceId,
    second: &FieldValue,
) -> ReconciliationError {
    ReconciliationError::TypeMismatch {
        field: field.to_string(),
        first_source: origin.get(field).cloned().unwrap_or_else(|| SourceId::new("?")),
        first_kind,
        second_source: second_source.clone(),
        second_kind: second.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    fn id(s: &str) -> SourceId {
        SourceId::new(s)
    }

    fn list_record(field: &str, items: &[&str]) -> FieldRecord {
        let mut r = FieldRecord::new();
        r.insert(field, FieldValue::list(items.iter().copied()));
        r
    }

    fn scalar_record(field: &str, value: &str) -> FieldRecord {
        let mut r = FieldRecord::new();
        r.insert(field, FieldValue::Scalar(value.to_string()));
        r
    }

    #[test]
    fn test_lists_concatenate_in_priority_order() {
        let a = (id("a"), list_record("example", &["x"]));
        let b = (id("b"), list_record("example", &["y"]));
        let priority = [id("a"), id("b")];

        let forward = merge(&[a.clone(), b.clone()], &priority).unwrap();
        let reversed = merge(&[b, a], &priority).unwrap();

        assert_eq!(forward.get("example"), Some(&FieldValue::list(["x", "y"])));
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_scalars_are_last_writer_wins() {
        let a = (id("a"), scalar_record("gender", "f"));
        let b = (id("b"), scalar_record("gender", "m"));

        let merged = merge(&[b.clone(), a.clone()], &[id("a"), id("b")]).unwrap();
        assert_eq!(merged.get("gender"), Some(&FieldValue::Scalar("m".into())));

        let merged = merge(&[a, b], &[id("b"), id("a")]).unwrap();
        assert_eq!(merged.get("gender"), Some(&FieldValue::Scalar("f".into())));
    }

    #[test]
    fn test_type_mismatch_fails_loudly() {
        let a = (id("a"), scalar_record("image", "one.jpg"));
        let b = (id("b"), list_record("image", &["two.jpg"]));

        let err = merge(&[a, b], &[id("a"), id("b")]).unwrap_err();
        match err {
            ReconciliationError::TypeMismatch {
                field,
                first_source,
                second_source,
                ..
            } => {
                assert_eq!(field, "image");
                assert_eq!(first_source, id("a"));
                assert_eq!(second_source, id("b"));
            }
        }
    }

    #[test]
    fn test_unlisted_sources_go_last_in_id_order() {
        let z = (id("zeta"), list_record("translation", &["z"]));
        let y = (id("ypsilon"), list_record("translation", &["y"]));
        let a = (id("a"), list_record("translation", &["a"]));

        let merged = merge(&[z, y, a], &[id("a")]).unwrap();
        assert_eq!(
            merged.get("translation"),
            Some(&FieldValue::list(["a", "y", "z"]))
        );
    }

    #[test]
    fn test_disjoint_fields_are_unioned_and_absent_fields_stay_absent() {
        let mut linguee = FieldRecord::new();
        linguee.set_list(Field::Translation, ["começar"]);
        let mut dicio = FieldRecord::new();
        dicio.set_untranslated_list(Field::Explanation, vec!["Dar início a.".into()]);

        let merged = merge(
            &[(id("dicio"), dicio), (id("linguee"), linguee)],
            &[id("linguee"), id("dicio")],
        )
        .unwrap();

        assert!(merged.contains("translation"));
        assert!(merged.contains("explanation"));
        assert!(merged.contains("explanation_trans"));
        assert!(!merged.contains("image"));
    }

    #[test]
    fn test_parallel_lists_stay_aligned() {
        let mut reverso = FieldRecord::new();
        reverso.set_list(Field::Example, ["vou começar"]);
        reverso.set_list(Field::ExampleTrans, ["ich fange an"]);
        let mut dicio = FieldRecord::new();
        dicio.set_untranslated_list(Field::Example, vec!["começou cedo".into()]);

        let merged = merge(
            &[(id("dicio"), dicio), (id("reverso"), reverso)],
            &[id("reverso"), id("dicio")],
        )
        .unwrap();

        assert_eq!(
            merged.pairs(Field::Example),
            vec![
                ("vou começar".to_string(), Some("ich fange an".to_string())),
                ("começou cedo".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_empty_record() {
        assert!(merge(&[], &[]).unwrap().is_empty());
    }
}
