#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use sombra_pushdown::storage::{
    decode_as, Column, DecodedBody, DecodedElement, EdgeBlock, ElementData, FetchHints,
    IteratorOptions, MapNameSubstitution, PropertySlot, RowMutation, VecColumnSource,
    VertexIterator,
};
use sombra_pushdown::types::{Direction, ElementKind, Result};

fn resolve_one(columns: Vec<Column>, hints: FetchHints) -> Result<Option<DecodedElement>> {
    let mut iter = VertexIterator::new(VecColumnSource::new(columns), IteratorOptions::new(hints));
    match iter.next() {
        None => Ok(None),
        Some(encoded) => Ok(Some(decode_as(&encoded?.value, ElementKind::Vertex)?)),
    }
}

fn vertex_edges(element: &DecodedElement) -> (&EdgeBlock, &EdgeBlock) {
    match &element.body {
        DecodedBody::Vertex {
            out_edges,
            in_edges,
        } => (out_edges, in_edges),
        other => panic!("expected vertex body, got {other:?}"),
    }
}

#[test]
fn property_soft_delete_after_value_hides_it() -> Result<()> {
    let slot = PropertySlot::new("k1", "p1", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&slot, 100, "a")
        .soft_delete_property(&slot, 150)
        .into_columns();
    let element = resolve_one(columns, FetchHints::all())?.expect("vertex emitted");
    assert!(element.properties.is_empty());

    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&slot, 100, "a")
        .soft_delete_property(&slot, 50)
        .into_columns();
    let element = resolve_one(columns, FetchHints::all())?.expect("vertex emitted");
    assert_eq!(element.properties.len(), 1);
    assert_eq!(element.properties[0].value, b"a");
    assert_eq!(element.properties[0].timestamp, 100);
    Ok(())
}

#[test]
fn edge_soft_delete_after_reference_hides_it() -> Result<()> {
    let build = |soft_delete_ts| {
        RowMutation::new("v1")
            .vertex_signal("", 1)
            .edge_ref(Direction::Out, "e1", "knows", "v2", "", 10)
            .expect("edge ref")
            .soft_delete_edge_ref(Direction::Out, "e1", soft_delete_ts)
            .into_columns()
    };

    let element = resolve_one(build(20), FetchHints::all())?.expect("vertex emitted");
    assert_eq!(vertex_edges(&element).0, &EdgeBlock::Refs(Vec::new()));

    let element = resolve_one(build(5), FetchHints::all())?.expect("vertex emitted");
    match vertex_edges(&element).0 {
        EdgeBlock::Refs(refs) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].edge_id.as_deref(), Some("e1"));
            assert_eq!(refs[0].label, "knows");
            assert_eq!(refs[0].vertex_id.as_deref(), Some("v2"));
            assert_eq!(refs[0].timestamp, 10);
        }
        other => panic!("expected refs, got {other:?}"),
    }
    Ok(())
}

#[test]
fn two_labels_share_one_table() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .edge_ref(Direction::Out, "e1", "knows", "v2", "", 10)?
        .edge_ref(Direction::Out, "e2", "likes", "v3", "", 10)?
        .edge_ref(Direction::Out, "e3", "knows", "v4", "", 10)?
        .into_columns();
    let mut iter = VertexIterator::new(
        VecColumnSource::new(columns),
        IteratorOptions::new(FetchHints::all()),
    );
    assert!(iter.advance_row()?);
    let vertex = iter.current();
    assert_eq!(vertex.labels().len(), 2);
    let labels: Vec<&[u8]> = vertex
        .edges(Direction::Out)
        .iter()
        .map(|(_, info)| vertex.edge_label(info).map(|l| &l[..]).unwrap_or_default())
        .collect();
    assert_eq!(labels, vec![&b"knows"[..], &b"likes"[..], &b"knows"[..]]);

    let encoded = vertex.encode(&FetchHints::all())?.expect("visible");
    let element = decode_as(&encoded, ElementKind::Vertex)?;
    match vertex_edges(&element).0 {
        EdgeBlock::Refs(refs) => {
            let grouped: Vec<(&str, Option<&str>)> = refs
                .iter()
                .map(|r| (r.label.as_str(), r.edge_id.as_deref()))
                .collect();
            assert_eq!(
                grouped,
                vec![("knows", Some("e1")), ("knows", Some("e3")), ("likes", Some("e2"))]
            );
        }
        other => panic!("expected refs, got {other:?}"),
    }
    Ok(())
}

#[test]
fn labels_and_counts_block() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .edge_ref(Direction::In, "e1", "knows", "v2", "", 10)?
        .edge_ref(Direction::In, "e2", "likes", "v3", "", 10)?
        .edge_ref(Direction::In, "e3", "knows", "v4", "", 10)?
        .into_columns();
    let hints = FetchHints::builder()
        .include_edge_labels_and_counts(true)
        .build();
    let element = resolve_one(columns, hints)?.expect("vertex emitted");
    let (out_edges, in_edges) = vertex_edges(&element);
    assert_eq!(out_edges, &EdgeBlock::LabelsAndCounts(Vec::new()));
    assert_eq!(
        in_edges,
        &EdgeBlock::LabelsAndCounts(vec![("knows".into(), 2), ("likes".into(), 1)])
    );
    Ok(())
}

#[test]
fn header_only_projection() -> Result<()> {
    let slot = PropertySlot::new("k1", "p1", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("vis", 7)
        .property(&slot, 7, "a")
        .edge_ref(Direction::Out, "e1", "knows", "v2", "", 10)?
        .extended_data_table("table1", 7)
        .into_columns();
    let element = resolve_one(columns, FetchHints::none())?.expect("vertex emitted");
    assert_eq!(element.id, "v1");
    assert_eq!(element.timestamp, 7);
    assert_eq!(element.visibility, "vis");
    assert!(element.properties.is_empty());
    assert_eq!(element.extended_data_table_names, None);
    assert_eq!(
        vertex_edges(&element),
        (&EdgeBlock::NotFetched, &EdgeBlock::NotFetched)
    );
    Ok(())
}

#[test]
fn ids_are_omitted_unless_requested() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .edge_ref(Direction::Out, "e1", "knows", "v2", "a", 10)?
        .into_columns();
    let hints = FetchHints::builder().include_out_edge_refs(true).build();
    let element = resolve_one(columns, hints)?.expect("vertex emitted");
    let (out_edges, in_edges) = vertex_edges(&element);
    assert_eq!(in_edges, &EdgeBlock::NotFetched);
    match out_edges {
        EdgeBlock::Refs(refs) => {
            assert_eq!(refs[0].edge_id, None);
            assert_eq!(refs[0].vertex_id, None);
            assert_eq!(refs[0].visibility, "a");
        }
        other => panic!("expected refs, got {other:?}"),
    }
    Ok(())
}

#[test]
fn hidden_element_needs_include_hidden() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .hide_element("secret", 2)
        .into_columns();
    assert!(resolve_one(columns.clone(), FetchHints::all())?.is_none());
    let element = resolve_one(columns, FetchHints::all_including_hidden())?.expect("emitted");
    assert_eq!(element.hidden_visibilities, vec!["secret".to_string()]);
    assert!(element.is_hidden());
    Ok(())
}

#[test]
fn unhidden_element_is_visible_again() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .unhide_element("secret", 3)
        .hide_element("secret", 2)
        .into_columns();
    let element = resolve_one(columns, FetchHints::all())?.expect("emitted");
    assert!(element.hidden_visibilities.is_empty());
    Ok(())
}

#[test]
fn hidden_property_carries_its_hiding_visibilities() -> Result<()> {
    let slot = PropertySlot::new("k1", "p1", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&slot, 5, "a")
        .hide_property(&slot, "h1", 6)
        .into_columns();
    let element = resolve_one(columns.clone(), FetchHints::all())?.expect("emitted");
    assert!(element.properties.is_empty());

    let element = resolve_one(columns, FetchHints::all_including_hidden())?.expect("emitted");
    assert_eq!(element.properties.len(), 1);
    assert_eq!(element.properties[0].hidden_visibilities, vec!["h1".to_string()]);
    assert!(element.properties[0].is_hidden());
    Ok(())
}

#[test]
fn element_soft_delete_suppresses_element_and_older_properties() -> Result<()> {
    let old = PropertySlot::new("k1", "old", "");
    let new = PropertySlot::new("k1", "new", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .soft_delete_element("", 10)
        .into_columns();
    assert!(resolve_one(columns, FetchHints::all())?.is_none());

    let columns = RowMutation::new("v1")
        .vertex_signal("", 20)
        .soft_delete_element("", 10)
        .property(&old, 5, "a")
        .property(&new, 15, "b")
        .into_columns();
    let element = resolve_one(columns, FetchHints::all())?.expect("recreated vertex");
    let names: Vec<&str> = element.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["new"]);
    Ok(())
}

#[test]
fn metadata_is_deduplicated_and_projected_by_key() -> Result<()> {
    let p1 = PropertySlot::new("k1", "p1", "");
    let p2 = PropertySlot::new("k1", "p2", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&p1, 10, "a")
        .property(&p2, 10, "b")
        .property_metadata(&p1, "modifiedBy", "", 10, "joe")
        .property_metadata(&p2, "modifiedBy", "", 10, "joe")
        .property_metadata(&p2, "confidence", "", 10, "0.5")
        .into_columns();

    let element = resolve_one(columns.clone(), FetchHints::all())?.expect("emitted");
    let p1_meta = element.property("k1", "p1").and_then(|p| p.metadata.clone());
    let p2_meta = element.property("k1", "p2").and_then(|p| p.metadata.clone());
    assert_eq!(p1_meta.as_ref().map(Vec::len), Some(1));
    assert_eq!(p2_meta.as_ref().map(Vec::len), Some(2));
    assert_eq!(p1_meta.as_ref().map(|m| m[0].value.clone()), Some(b"joe".to_vec()));

    let hints = FetchHints::builder()
        .include_all_properties(true)
        .metadata_keys(["confidence"])
        .build();
    let element = resolve_one(columns.clone(), hints)?.expect("emitted");
    let p1_meta = element.property("k1", "p1").and_then(|p| p.metadata.clone());
    let p2_meta = element.property("k1", "p2").and_then(|p| p.metadata.clone());
    assert_eq!(p1_meta, Some(Vec::new()));
    assert_eq!(p2_meta.map(|m| m[0].key.clone()), Some("confidence".into()));

    let hints = FetchHints::builder().include_all_properties(true).build();
    let element = resolve_one(columns, hints)?.expect("emitted");
    assert!(element.properties.iter().all(|p| p.metadata.is_none()));
    Ok(())
}

#[test]
fn previous_metadata_is_dropped_unless_requested() -> Result<()> {
    let slot = PropertySlot::new("k1", "p1", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&slot, 20, "b")
        .property_metadata(&slot, "modifiedBy", "", 10, "joe")
        .into_columns();
    let hints = FetchHints::builder()
        .include_all_properties(true)
        .include_all_property_metadata(true)
        .build();
    let element = resolve_one(columns.clone(), hints.clone())?.expect("emitted");
    assert_eq!(element.properties[0].metadata, Some(Vec::new()));

    let hints = hints_with_previous(hints);
    let element = resolve_one(columns, hints)?.expect("emitted");
    assert_eq!(element.properties[0].metadata.as_ref().map(Vec::len), Some(1));
    Ok(())
}

fn hints_with_previous(hints: FetchHints) -> FetchHints {
    sombra_pushdown::storage::FetchHintsBuilder::from_hints(hints)
        .include_previous_metadata(true)
        .build()
}

#[test]
fn property_name_filter() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&PropertySlot::new("k", "name", ""), 1, "joe")
        .property(&PropertySlot::new("k", "age", ""), 1, "42")
        .into_columns();
    let hints = FetchHints::builder().property_names(["age"]).build();
    let element = resolve_one(columns, hints)?.expect("emitted");
    let names: Vec<&str> = element.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["age"]);
    Ok(())
}

#[test]
fn visibility_sets_are_sorted_and_deduplicated() -> Result<()> {
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .additional_visibility("zeta", 1)
        .additional_visibility("alpha", 1)
        .additional_visibility("alpha", 2)
        .remove_additional_visibility("gone", 3)
        .additional_visibility("gone", 2)
        .extended_data_table("t2", 1)
        .extended_data_table("t1", 1)
        .into_columns();
    let element = resolve_one(columns, FetchHints::all())?.expect("emitted");
    assert_eq!(element.additional_visibilities, vec!["alpha", "zeta"]);
    assert_eq!(
        element.extended_data_table_names,
        Some(vec!["t1".to_string(), "t2".to_string()])
    );
    Ok(())
}

#[test]
fn encode_is_idempotent() -> Result<()> {
    let slot = PropertySlot::new("k1", "p1", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&slot, 5, "a")
        .property_metadata(&slot, "m", "", 5, "x")
        .edge_ref(Direction::Out, "e1", "knows", "v2", "", 10)?
        .into_columns();
    let mut iter = VertexIterator::new(
        VecColumnSource::new(columns),
        IteratorOptions::new(FetchHints::all()),
    );
    assert!(iter.advance_row()?);
    let first = iter.current().encode(&FetchHints::all())?;
    let second = iter.current().encode(&FetchHints::all())?;
    assert!(first.is_some());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn names_equal_to_stored_forms_keep_their_identity() -> Result<()> {
    let names = Arc::new(MapNameSubstitution::from_pairs([("n1", "firstName")])?);
    let columns = RowMutation::with_names("v1", names.clone())
        .vertex_signal("", 1)
        .property(&PropertySlot::new("k", "n1", ""), 1, "raw")
        .property(&PropertySlot::new("k", "firstName", ""), 1, "full")
        .into_columns();
    let options = IteratorOptions::new(FetchHints::all()).names(names);
    let mut iter = VertexIterator::new(VecColumnSource::new(columns), options);
    let element = decode_as(&iter.next().expect("vertex")?.value, ElementKind::Vertex)?;
    let mut found: Vec<(&str, &[u8])> = element
        .properties
        .iter()
        .map(|p| (p.name.as_str(), p.value.as_slice()))
        .collect();
    found.sort();
    assert_eq!(found, vec![("firstName", &b"full"[..]), ("n1", &b"raw"[..])]);
    Ok(())
}

#[test]
fn hidden_marker_matches_property_whose_visibility_is_a_stored_name() -> Result<()> {
    let names = Arc::new(MapNameSubstitution::from_pairs([("s", "secret")])?);
    let slot = PropertySlot::new("k1", "p1", "s");
    let columns = RowMutation::with_names("v1", names.clone())
        .vertex_signal("", 1)
        .property(&slot, 5, "a")
        .hide_property(&slot, "h", 6)
        .into_columns();
    let options = IteratorOptions::new(FetchHints::all()).names(names);
    let mut iter = VertexIterator::new(VecColumnSource::new(columns), options);
    let element = decode_as(&iter.next().expect("vertex")?.value, ElementKind::Vertex)?;
    assert!(element.properties.is_empty());
    Ok(())
}

#[test]
fn hidden_and_soft_deleted_property_stays_excluded_with_include_hidden() -> Result<()> {
    let slot = PropertySlot::new("k1", "p1", "");
    let columns = RowMutation::new("v1")
        .vertex_signal("", 1)
        .property(&slot, 5, "a")
        .hide_property(&slot, "h", 6)
        .soft_delete_property(&slot, 7)
        .into_columns();
    let element =
        resolve_one(columns, FetchHints::all_including_hidden())?.expect("vertex emitted");
    assert!(element.properties.is_empty());
    Ok(())
}

const PROPERTY_NAMES: [&str; 4] = ["a", "b", "c", "d"];
const EDGE_LABELS: [&str; 2] = ["knows", "likes"];

/// `(value ts, soft-delete ts, hidden)` per property name index.
type PropertyModel = BTreeMap<usize, (i64, Option<i64>, bool)>;
/// `(ref ts, soft-delete ts, hidden, label index)` per out-edge index.
type EdgeModel = BTreeMap<usize, (i64, Option<i64>, bool, usize)>;

fn model_columns(properties: &PropertyModel, edges: &EdgeModel) -> Vec<Column> {
    let mut row = RowMutation::new("v1").vertex_signal("", 1);
    for (idx, (ts, soft_delete, hidden)) in properties {
        let slot = PropertySlot::new("k", PROPERTY_NAMES[*idx], "");
        row = row.property(&slot, *ts, format!("value-{idx}"));
        if let Some(sd) = soft_delete {
            row = row.soft_delete_property(&slot, *sd);
        }
        if *hidden {
            row = row.hide_property(&slot, "h", *ts);
        }
    }
    for (idx, (ts, soft_delete, hidden, label)) in edges {
        let edge_id = format!("e{idx}");
        row = row
            .edge_ref(Direction::Out, &edge_id, EDGE_LABELS[*label], "v2", "", *ts)
            .expect("edge ref");
        if let Some(sd) = soft_delete {
            row = row.soft_delete_edge_ref(Direction::Out, &edge_id, *sd);
        }
        if *hidden {
            row = row.hide_edge_ref(Direction::Out, &edge_id, "h", *ts);
        }
    }
    row.into_columns()
}

fn hints_strategy() -> impl Strategy<Value = FetchHints> {
    (
        any::<bool>(),
        proptest::option::of(proptest::collection::btree_set(0usize..4, 0..4)),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(include_hidden, names, refs, counts, ids)| {
            let builder = FetchHints::builder()
                .include_hidden(include_hidden)
                .include_out_edge_refs(refs)
                .include_edge_labels_and_counts(counts)
                .include_edge_ids(ids);
            match names {
                None => builder.include_all_properties(true).build(),
                Some(names) => builder
                    .property_names(names.into_iter().map(|i| PROPERTY_NAMES[i]))
                    .build(),
            }
        })
}

proptest! {
    #[test]
    fn property_soft_delete_dominance(value_ts in 1i64..1_000, soft_delete_ts in 1i64..1_000) {
        let slot = PropertySlot::new("k1", "p1", "");
        let columns = RowMutation::new("v1")
            .vertex_signal("", 1)
            .property(&slot, value_ts, "a")
            .soft_delete_property(&slot, soft_delete_ts)
            .into_columns();
        let element = resolve_one(columns, FetchHints::all())
            .expect("resolves")
            .expect("vertex emitted");
        prop_assert_eq!(element.properties.is_empty(), soft_delete_ts >= value_ts);
    }

    #[test]
    fn edge_soft_delete_dominance(edge_ts in 1i64..1_000, soft_delete_ts in 1i64..1_000) {
        let columns = RowMutation::new("v1")
            .vertex_signal("", 1)
            .edge_ref(Direction::Out, "e1", "knows", "v2", "", edge_ts)
            .expect("edge ref")
            .soft_delete_edge_ref(Direction::Out, "e1", soft_delete_ts)
            .into_columns();
        let element = resolve_one(columns, FetchHints::all())
            .expect("resolves")
            .expect("vertex emitted");
        let (out_edges, _) = vertex_edges(&element);
        prop_assert_eq!(out_edges.edge_count() == 0, soft_delete_ts >= edge_ts);
    }

    #[test]
    fn newest_property_version_wins(timestamps in proptest::collection::btree_set(1i64..10_000, 1..8)) {
        let slot = PropertySlot::new("k1", "p1", "");
        let mut mutation = RowMutation::new("v1").vertex_signal("", 1);
        for ts in &timestamps {
            mutation = mutation.property(&slot, *ts, ts.to_string());
        }
        let element = resolve_one(mutation.into_columns(), FetchHints::all())
            .expect("resolves")
            .expect("vertex emitted");
        let newest = *timestamps.iter().next_back().expect("non-empty");
        prop_assert_eq!(element.properties.len(), 1);
        prop_assert_eq!(element.properties[0].timestamp, newest);
        prop_assert_eq!(element.properties[0].value.clone(), newest.to_string().into_bytes());
    }
}

proptest! {
    #[test]
    fn encoding_matches_visible_model_for_any_hints(
        properties in proptest::collection::btree_map(
            0usize..4,
            (1i64..50, proptest::option::of(1i64..50), any::<bool>()),
            0..4,
        ),
        edges in proptest::collection::btree_map(
            0usize..6,
            (1i64..50, proptest::option::of(1i64..50), any::<bool>(), 0usize..2),
            0..6,
        ),
        hints in hints_strategy(),
    ) {
        let columns = model_columns(&properties, &edges);
        let mut iter = VertexIterator::new(
            VecColumnSource::new(columns),
            IteratorOptions::new(hints.clone()),
        );
        prop_assert!(iter.advance_row().expect("row resolves"));
        let first = iter.current().encode(&hints).expect("encodes").expect("visible");
        let second = iter.current().encode(&hints).expect("encodes").expect("visible");
        prop_assert_eq!(&first, &second);

        let element = decode_as(&first, ElementKind::Vertex).expect("decodes");
        let expected_properties: BTreeSet<(String, bool)> = properties
            .iter()
            .filter(|(idx, (ts, soft_delete, hidden))| {
                soft_delete.map_or(true, |sd| sd < *ts)
                    && (hints.include_hidden || !*hidden)
                    && hints.includes_property(PROPERTY_NAMES[**idx])
            })
            .map(|(idx, (_, _, hidden))| (PROPERTY_NAMES[*idx].to_string(), *hidden))
            .collect();
        let found_properties: BTreeSet<(String, bool)> = element
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.is_hidden()))
            .collect();
        prop_assert_eq!(element.properties.len(), found_properties.len());
        prop_assert_eq!(found_properties, expected_properties);

        let live: BTreeSet<String> = edges
            .iter()
            .filter(|(_, (ts, soft_delete, hidden, _))| {
                soft_delete.map_or(true, |sd| sd < *ts) && (hints.include_hidden || !*hidden)
            })
            .map(|(idx, _)| format!("e{idx}"))
            .collect();
        let (out_edges, _) = vertex_edges(&element);
        match out_edges {
            EdgeBlock::Refs(refs) => {
                prop_assert!(hints.include_out_edge_refs);
                prop_assert_eq!(refs.len(), live.len());
                if hints.include_edge_ids {
                    let ids: BTreeSet<String> =
                        refs.iter().filter_map(|r| r.edge_id.clone()).collect();
                    prop_assert_eq!(ids, live.clone());
                } else {
                    prop_assert!(refs.iter().all(|r| r.edge_id.is_none()));
                }
            }
            EdgeBlock::LabelsAndCounts(_) => {
                prop_assert!(!hints.include_out_edge_refs && hints.include_edge_labels_and_counts);
                prop_assert_eq!(out_edges.edge_count(), live.len());
            }
            EdgeBlock::NotFetched => {
                prop_assert!(!hints.include_out_edge_refs && !hints.include_edge_labels_and_counts);
            }
        }
    }
}
