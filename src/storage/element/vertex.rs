use bytes::Bytes;

use crate::primitives::bytes::write;
use crate::storage::column::Column;
use crate::storage::edge_info::IteratorEdgeInfo;
use crate::storage::edge_labels::EdgeLabels;
use crate::storage::edges::EdgeCollection;
use crate::storage::family::ColumnFamily;
use crate::storage::hints::FetchHints;
use crate::storage::qualifier::NameSubstitution;
use crate::storage::record::{EDGE_BLOCK_LABELS_AND_COUNTS, EDGE_BLOCK_NONE, EDGE_BLOCK_REFS};
use crate::types::{Direction, ElementKind, PushdownError, Result, Timestamp};

use super::{ElementCore, ElementData, HIDDEN_VALUE_DELETED};

/// Edge references and markers for one direction.
#[derive(Clone, Debug, Default)]
struct EdgeSide {
    edges: EdgeCollection,
    // edge id -> newest delete-marker timestamp
    deleted: Vec<(Bytes, Timestamp)>,
    // edge id -> newest soft-delete timestamp
    soft_deletes: Vec<(Bytes, Timestamp)>,
}

impl EdgeSide {
    fn clear(&mut self) {
        self.edges.clear();
        self.deleted.clear();
        self.soft_deletes.clear();
    }

    fn soft_deleted_at_or_after(&self, edge_id: &[u8], ts: Timestamp) -> bool {
        self.soft_deletes
            .iter()
            .any(|(id, sd)| id.as_ref() == edge_id && *sd >= ts)
    }
}

#[derive(Clone, Debug)]
struct HiddenEdge {
    edge_id: Bytes,
    visibility: Bytes,
    active: bool,
}

/// Resolution state of a vertex row.
#[derive(Clone, Debug, Default)]
pub struct VertexData {
    core: ElementCore,
    labels: EdgeLabels,
    out_side: EdgeSide,
    in_side: EdgeSide,
    hidden_edges: Vec<HiddenEdge>,
}

impl VertexData {
    /// Label table shared by both directions.
    pub fn labels(&self) -> &EdgeLabels {
        &self.labels
    }

    /// Resolved references for `direction`, before visibility rules.
    pub fn edges(&self, direction: Direction) -> &EdgeCollection {
        &self.side(direction).edges
    }

    /// Label of `info`.
    pub fn edge_label(&self, info: &IteratorEdgeInfo) -> Option<&Bytes> {
        self.labels.get(info.label_index())
    }

    /// Whether an active hidden marker exists for `edge_id`.
    pub fn is_edge_hidden(&self, edge_id: &[u8]) -> bool {
        self.hidden_edges
            .iter()
            .any(|h| h.active && h.edge_id.as_ref() == edge_id)
    }

    /// References for `direction` that survive markers and `hints`.
    pub fn visible_edges<'a>(
        &'a self,
        direction: Direction,
        hints: &'a FetchHints,
    ) -> impl Iterator<Item = (&'a Bytes, &'a IteratorEdgeInfo)> + 'a {
        let side = self.side(direction);
        side.edges
            .iter()
            .filter(move |(id, info)| self.is_edge_live(side, id, info, hints))
    }

    fn side(&self, direction: Direction) -> &EdgeSide {
        match direction {
            Direction::Out => &self.out_side,
            Direction::In => &self.in_side,
        }
    }

    fn is_edge_live(
        &self,
        side: &EdgeSide,
        edge_id: &[u8],
        info: &IteratorEdgeInfo,
        hints: &FetchHints,
    ) -> bool {
        if !hints.include_hidden && self.is_edge_hidden(edge_id) {
            return false;
        }
        if side.soft_deleted_at_or_after(edge_id, info.timestamp()) {
            return false;
        }
        self.edge_label(info)
            .is_some_and(|label| hints.includes_edge_label(label))
    }

    fn apply_edge_ref(&mut self, direction: Direction, column: &Column) -> Result<()> {
        let key = &column.key;
        let side = match direction {
            Direction::Out => &mut self.out_side,
            Direction::In => &mut self.in_side,
        };
        let edge_id = &key.qualifier;

        if key.deleted {
            if side
                .edges
                .get(edge_id)
                .is_some_and(|info| info.timestamp() <= key.timestamp)
            {
                side.edges.remove(edge_id);
            }
            keep_newest(&mut side.deleted, edge_id, key.timestamp);
            return Ok(());
        }

        if side
            .deleted
            .iter()
            .any(|(id, ts)| id == edge_id && *ts >= key.timestamp)
        {
            return Ok(());
        }
        if let Some(existing) = side.edges.get(edge_id) {
            if existing.timestamp() >= key.timestamp {
                return Ok(());
            }
            side.edges.remove(edge_id);
        }
        let info = IteratorEdgeInfo::decode(
            &column.value,
            key.timestamp,
            key.visibility.clone(),
            &mut self.labels,
        )?;
        side.edges.add(edge_id.clone(), info);
        Ok(())
    }

    fn apply_edge_hidden(&mut self, column: &Column) {
        let key = &column.key;
        if self
            .hidden_edges
            .iter()
            .any(|h| h.edge_id == key.qualifier && h.visibility == key.visibility)
        {
            return;
        }
        self.hidden_edges.push(HiddenEdge {
            edge_id: key.qualifier.clone(),
            visibility: key.visibility.clone(),
            active: !key.deleted && column.value.as_ref() != HIDDEN_VALUE_DELETED,
        });
    }

    fn apply_edge_soft_delete(&mut self, direction: Direction, column: &Column) {
        let key = &column.key;
        if key.deleted {
            return;
        }
        let side = match direction {
            Direction::Out => &mut self.out_side,
            Direction::In => &mut self.in_side,
        };
        keep_newest(&mut side.soft_deletes, &key.qualifier, key.timestamp);
    }

    fn encode_side(&self, direction: Direction, hints: &FetchHints, out: &mut Vec<u8>) -> Result<()> {
        write::put_u8(out, direction.tag());
        let side = self.side(direction);

        if hints.includes_edge_refs(direction) {
            write::put_u8(out, EDGE_BLOCK_REFS);
            let mut groups: Vec<(u32, Vec<(&Bytes, &IteratorEdgeInfo)>)> = Vec::new();
            for (id, info) in self.visible_edges(direction, hints) {
                match groups.iter_mut().find(|(idx, _)| *idx == info.label_index()) {
                    Some((_, group)) => group.push((id, info)),
                    None => groups.push((info.label_index(), vec![(id, info)])),
                }
            }
            groups.sort_by_key(|(idx, _)| *idx);
            write::put_len(out, groups.len())?;
            for (idx, group) in &groups {
                write::put_bytes(out, Some(self.label_at(*idx)?))?;
                write::put_len(out, group.len())?;
                for (id, info) in group {
                    write::put_bytes(out, hints.include_edge_ids.then_some(&id[..]))?;
                    write::put_i64(out, info.timestamp());
                    write::put_bytes(
                        out,
                        hints
                            .include_edge_vertex_ids
                            .then_some(&info.vertex_id()[..]),
                    )?;
                    write::put_bytes(out, Some(&info.visibility()[..]))?;
                }
            }
        } else if hints.include_edge_labels_and_counts {
            write::put_u8(out, EDGE_BLOCK_LABELS_AND_COUNTS);
            let mut counts = vec![0u32; self.labels.len()];
            for (_, info) in side
                .edges
                .iter()
                .filter(|(id, info)| self.is_edge_live(side, id, info, hints))
            {
                if let Some(count) = counts.get_mut(info.label_index() as usize) {
                    *count += 1;
                }
            }
            let present: Vec<(u32, u32)> = counts
                .iter()
                .enumerate()
                .filter(|(_, count)| **count > 0)
                .map(|(idx, count)| (idx as u32, *count))
                .collect();
            write::put_len(out, present.len())?;
            for (idx, count) in present {
                write::put_bytes(out, Some(self.label_at(idx)?))?;
                write::put_len(out, count as usize)?;
            }
        } else {
            write::put_u8(out, EDGE_BLOCK_NONE);
        }
        Ok(())
    }

    fn label_at(&self, idx: u32) -> Result<&[u8]> {
        self.labels.get(idx).map(|l| l.as_ref()).ok_or_else(|| {
            PushdownError::format(
                "edge label index",
                format_args!("0..{}", self.labels.len()),
                idx,
            )
        })
    }
}

fn keep_newest(list: &mut Vec<(Bytes, Timestamp)>, edge_id: &Bytes, ts: Timestamp) {
    match list.iter_mut().find(|(id, _)| id == edge_id) {
        Some((_, existing)) => *existing = (*existing).max(ts),
        None => list.push((edge_id.clone(), ts)),
    }
}

impl ElementData for VertexData {
    const KIND: ElementKind = ElementKind::Vertex;

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn apply_signal(&mut self, column: &Column, _names: &dyn NameSubstitution) -> Result<()> {
        self.core.apply_signal(column)?;
        Ok(())
    }

    fn process_kind_column(
        &mut self,
        family: ColumnFamily,
        column: &Column,
        _names: &dyn NameSubstitution,
    ) -> Result<()> {
        match family {
            ColumnFamily::OutEdge => self.apply_edge_ref(Direction::Out, column)?,
            ColumnFamily::InEdge => self.apply_edge_ref(Direction::In, column)?,
            ColumnFamily::OutEdgeHidden | ColumnFamily::InEdgeHidden => {
                self.apply_edge_hidden(column)
            }
            ColumnFamily::OutEdgeSoftDelete => {
                self.apply_edge_soft_delete(Direction::Out, column)
            }
            ColumnFamily::InEdgeSoftDelete => self.apply_edge_soft_delete(Direction::In, column),
            other => {
                return Err(PushdownError::ProtocolViolation {
                    family: String::from_utf8_lossy(other.tag()).into_owned(),
                    kind: ElementKind::Vertex,
                })
            }
        }
        Ok(())
    }

    fn encode_body(&self, hints: &FetchHints, out: &mut Vec<u8>) -> Result<()> {
        self.encode_side(Direction::Out, hints, out)?;
        self.encode_side(Direction::In, hints, out)
    }

    fn clear_kind(&mut self) {
        self.labels.clear();
        self.out_side.clear();
        self.in_side.clear();
        self.hidden_edges.clear();
    }
}
