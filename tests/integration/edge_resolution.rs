#![allow(missing_docs)]

use std::sync::Arc;

use sombra_pushdown::storage::{
    decode, decode_as, DecodedBody, EdgeIterator, FetchHints, IteratorOptions,
    MapNameSubstitution, PropertySlot, RowMutation, VecColumnSource,
};
use sombra_pushdown::types::{ElementKind, PushdownError, Result};

fn edge_row(label: &str) -> RowMutation {
    RowMutation::new("e1")
        .edge_signal(label, "", 5)
        .out_vertex("v1", 5)
        .in_vertex("v2", 5)
}

#[test]
fn edge_record_carries_label_and_endpoints() -> Result<()> {
    let slot = PropertySlot::new("k1", "since", "");
    let columns = edge_row("knows").property(&slot, 5, "2020").into_columns();
    let mut iter = EdgeIterator::new(
        VecColumnSource::new(columns),
        IteratorOptions::new(FetchHints::all()),
    );
    let encoded = iter.next().expect("one edge")?;
    assert!(iter.next().is_none());

    let element = decode(&encoded.value)?;
    assert_eq!(element.kind, ElementKind::Edge);
    assert_eq!(element.id, "e1");
    assert_eq!(
        element.body,
        DecodedBody::Edge {
            label: "knows".into(),
            out_vertex_id: "v1".into(),
            in_vertex_id: "v2".into(),
        }
    );
    assert_eq!(
        element.property("k1", "since").map(|p| p.value.clone()),
        Some(b"2020".to_vec())
    );
    assert!(matches!(
        decode_as(&encoded.value, ElementKind::Vertex),
        Err(PushdownError::Format { .. })
    ));
    Ok(())
}

#[test]
fn moved_endpoint_uses_newest_column() -> Result<()> {
    let columns = edge_row("knows").out_vertex("v9", 8).into_columns();
    let mut iter = EdgeIterator::new(VecColumnSource::new(columns), IteratorOptions::default());
    assert!(iter.advance_row()?);
    assert_eq!(iter.current().out_vertex_id(), Some("v9"));
    assert_eq!(iter.current().in_vertex_id(), Some("v2"));
    Ok(())
}

#[test]
fn deleted_edge_is_skipped() -> Result<()> {
    let columns = edge_row("knows").delete_edge("knows", "", 9).into_columns();
    let mut iter = EdgeIterator::new(
        VecColumnSource::new(columns),
        IteratorOptions::new(FetchHints::all()),
    );
    assert!(iter.next().is_none());
    Ok(())
}

#[test]
fn recreated_edge_is_emitted() -> Result<()> {
    let columns = edge_row("knows")
        .delete_edge("knows", "", 3)
        .into_columns();
    let mut iter = EdgeIterator::new(
        VecColumnSource::new(columns),
        IteratorOptions::new(FetchHints::all()),
    );
    let element = decode(&iter.next().expect("edge")?.value)?;
    assert_eq!(element.timestamp, 5);
    Ok(())
}

#[test]
fn substituted_names_are_inflated() -> Result<()> {
    let names = Arc::new(MapNameSubstitution::from_pairs([
        ("k", "knows"),
        ("s", "since"),
    ])?);
    let slot = PropertySlot::new("key", "since", "");
    let columns = RowMutation::with_names("e1", names.clone())
        .edge_signal("knows", "", 5)
        .out_vertex("v1", 5)
        .in_vertex("v2", 5)
        .property(&slot, 5, "2020")
        .into_columns();
    assert!(columns.iter().any(|c| c.key.qualifier.as_ref() == b"k"));

    let options = IteratorOptions::new(FetchHints::all()).names(names);
    let mut iter = EdgeIterator::new(VecColumnSource::new(columns), options);
    let element = decode(&iter.next().expect("edge")?.value)?;
    match &element.body {
        DecodedBody::Edge { label, .. } => assert_eq!(label, "knows"),
        other => panic!("expected edge body, got {other:?}"),
    }
    assert!(element.property("key", "since").is_some());
    Ok(())
}

#[test]
fn vertex_family_on_edge_row_is_rejected() -> Result<()> {
    let columns = edge_row("knows")
        .edge_ref(
            sombra_pushdown::types::Direction::Out,
            "e9",
            "knows",
            "v3",
            "",
            5,
        )?
        .into_columns();
    let mut iter = EdgeIterator::new(VecColumnSource::new(columns), IteratorOptions::default());
    match iter.next() {
        Some(Err(PushdownError::ProtocolViolation { family, kind })) => {
            assert_eq!(family, "EOUT");
            assert_eq!(kind, ElementKind::Edge);
        }
        other => panic!("expected protocol violation, got {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_property_qualifier_is_a_configuration_error() {
    let columns = vec![
        sombra_pushdown::storage::Column::put("e1", b"E", "knows", "", 1, ""),
        sombra_pushdown::storage::Column::put("e1", b"PROP", "no-separator", "", 1, "x"),
    ];
    let mut iter = EdgeIterator::new(VecColumnSource::new(columns), IteratorOptions::default());
    assert!(matches!(
        iter.next(),
        Some(Err(PushdownError::Configuration {
            expected: 2,
            found: 1,
            ..
        }))
    ));
}
