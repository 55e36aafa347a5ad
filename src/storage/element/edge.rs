use crate::primitives::bytes::write;
use crate::storage::column::Column;
use crate::storage::family::ColumnFamily;
use crate::storage::hints::FetchHints;
use crate::storage::qualifier::NameSubstitution;
use crate::types::{ElementKind, PushdownError, Result, Timestamp};

use super::{ElementCore, ElementData};

/// Newest endpoint column for one side of an edge.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Endpoint {
    timestamp: Timestamp,
    // `None` when the newest column is a delete marker.
    vertex_id: Option<String>,
}

/// Resolution state of an edge row.
#[derive(Clone, Debug, Default)]
pub struct EdgeData {
    core: ElementCore,
    label: Option<String>,
    out_vertex: Option<Endpoint>,
    in_vertex: Option<Endpoint>,
}

impl EdgeData {
    /// Label from the honored signal column.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Tail vertex id.
    pub fn out_vertex_id(&self) -> Option<&str> {
        self.out_vertex.as_ref().and_then(|e| e.vertex_id.as_deref())
    }

    /// Head vertex id.
    pub fn in_vertex_id(&self) -> Option<&str> {
        self.in_vertex.as_ref().and_then(|e| e.vertex_id.as_deref())
    }
}

fn apply_endpoint(slot: &mut Option<Endpoint>, column: &Column) -> Result<()> {
    let key = &column.key;
    if slot
        .as_ref()
        .is_some_and(|current| key.timestamp <= current.timestamp)
    {
        return Ok(());
    }
    let vertex_id = if key.deleted {
        None
    } else {
        Some(key.qualifier_str()?.to_owned())
    };
    *slot = Some(Endpoint {
        timestamp: key.timestamp,
        vertex_id,
    });
    Ok(())
}

fn required<'a>(value: Option<&'a str>, context: &'static str) -> Result<&'a str> {
    value.ok_or_else(|| PushdownError::format(context, "a value", "none"))
}

impl ElementData for EdgeData {
    const KIND: ElementKind = ElementKind::Edge;

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn apply_signal(&mut self, column: &Column, names: &dyn NameSubstitution) -> Result<()> {
        if !self.core.apply_signal(column)? {
            return Ok(());
        }
        if column.key.deleted {
            self.label = None;
            self.out_vertex = None;
            self.in_vertex = None;
        } else {
            let stored = column.key.qualifier_str()?;
            self.label = Some(names.inflate(stored).into_owned());
        }
        Ok(())
    }

    fn process_kind_column(
        &mut self,
        family: ColumnFamily,
        column: &Column,
        _names: &dyn NameSubstitution,
    ) -> Result<()> {
        if self.core.is_deleted() {
            return Ok(());
        }
        match family {
            ColumnFamily::OutVertex => apply_endpoint(&mut self.out_vertex, column),
            ColumnFamily::InVertex => apply_endpoint(&mut self.in_vertex, column),
            other => Err(PushdownError::ProtocolViolation {
                family: String::from_utf8_lossy(other.tag()).into_owned(),
                kind: ElementKind::Edge,
            }),
        }
    }

    fn encode_body(&self, _hints: &FetchHints, out: &mut Vec<u8>) -> Result<()> {
        let label = required(self.label(), "edge label")?;
        let out_vertex_id = required(self.out_vertex_id(), "edge out vertex id")?;
        let in_vertex_id = required(self.in_vertex_id(), "edge in vertex id")?;
        write::put_str(out, Some(label))?;
        write::put_str(out, Some(out_vertex_id))?;
        write::put_str(out, Some(in_vertex_id))?;
        Ok(())
    }

    fn clear_kind(&mut self) {
        self.label = None;
        self.out_vertex = None;
        self.in_vertex = None;
    }
}
