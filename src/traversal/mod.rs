//! Traversal Engine (§4.11): BFS over the adjacency tables with depth
//! bounds, edge/vertex filters, `@depth` tagging, and shortest-path
//! reconstruction.

use std::collections::{HashSet, VecDeque};

use heed3::RoTxn;

use crate::error::{GraphError, Result};
use crate::ids::{ClassId, PositionId, RecordDescriptor, RecordId};
use crate::query::GraphFilter;
use crate::record::Record;
use crate::schema::SchemaCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    All,
}

/// The storage surface BFS needs: adjacency enumeration plus record fetch,
/// supplied by the transaction layer the same way `query::QueryBackend` is.
pub trait TraversalBackend {
    fn catalog(&self) -> &SchemaCatalog;
    fn txn(&self) -> &RoTxn<'_>;

    /// `(edge_rid, neighbor_rid)` pairs incident to `v` in the requested
    /// direction (both lists concatenated for `Direction::All`).
    fn adjacency(&self, v: RecordId, direction: Direction) -> Result<Vec<(RecordId, RecordId)>>;

    fn get_vertex_record(&self, class_id: ClassId, position_id: PositionId) -> Result<Option<Record>>;
    fn get_edge_record(&self, class_id: ClassId, position_id: PositionId) -> Result<Option<Record>>;
}

pub struct TraversalSpec<'a> {
    pub direction: Direction,
    pub min_depth: u16,
    pub max_depth: u16,
    pub edge_filter: Option<&'a GraphFilter>,
    pub vertex_filter: Option<&'a GraphFilter>,
}

fn record_for(backend: &impl TraversalBackend, rid: RecordId, is_edge: bool) -> Result<Record> {
    let record = if is_edge {
        backend.get_edge_record(rid.class_id, rid.position_id)?
    } else {
        backend.get_vertex_record(rid.class_id, rid.position_id)?
    };
    record.ok_or_else(|| GraphError::NoExistRecord.into())
}

/// Runs BFS from `sources`, emitting `RecordDescriptor`s tagged with
/// discovery depth in BFS order (§4.11 algorithm steps 1-3).
pub fn bfs(backend: &impl TraversalBackend, sources: &[RecordId], spec: &TraversalSpec<'_>) -> Result<Vec<RecordDescriptor>> {
    let mut visited: HashSet<RecordId> = HashSet::new();
    let mut queue: VecDeque<(RecordId, u16)> = VecDeque::new();
    let mut out = Vec::new();

    for &src in sources {
        if visited.insert(src) {
            if spec.min_depth == 0 {
                out.push(RecordDescriptor::at_depth(src, 0));
            }
            queue.push_back((src, 0));
        }
    }

    while let Some((v, depth)) = queue.pop_front() {
        if depth >= spec.max_depth {
            continue;
        }
        for (edge_rid, neighbor_rid) in backend.adjacency(v, spec.direction)? {
            if let Some(edge_filter) = spec.edge_filter {
                let edge_record = record_for(backend, edge_rid, true)?;
                if !edge_filter.matches(backend.catalog(), backend.txn(), edge_rid.class_id, &edge_record)? {
                    continue;
                }
            }
            if visited.contains(&neighbor_rid) {
                continue;
            }
            let vertex_record = record_for(backend, neighbor_rid, false)?;
            let admitted = match spec.vertex_filter {
                Some(f) => f.matches(backend.catalog(), backend.txn(), neighbor_rid.class_id, &vertex_record)?,
                None => true,
            };
            visited.insert(neighbor_rid);
            if !admitted {
                continue;
            }
            let next_depth = depth + 1;
            if spec.min_depth <= next_depth && next_depth <= spec.max_depth {
                out.push(RecordDescriptor::at_depth(neighbor_rid, next_depth));
            }
            if next_depth < spec.max_depth {
                queue.push_back((neighbor_rid, next_depth));
            }
        }
    }

    Ok(out)
}

/// BFS from `src` to `dst`, returning the node sequence with depths attached
/// or an empty sequence when unreachable. `src == dst` returns a single-node
/// sequence at depth 0 (§4.11).
pub fn shortest_path(
    backend: &impl TraversalBackend,
    src: RecordId,
    dst: RecordId,
    spec: &TraversalSpec<'_>,
) -> Result<Vec<RecordDescriptor>> {
    if src == dst {
        return Ok(vec![RecordDescriptor::at_depth(src, 0)]);
    }

    let mut visited: HashSet<RecordId> = HashSet::new();
    let mut predecessor: std::collections::HashMap<RecordId, RecordId> = std::collections::HashMap::new();
    let mut queue: VecDeque<(RecordId, u16)> = VecDeque::new();
    visited.insert(src);
    queue.push_back((src, 0));

    let mut found_depth = None;
    'bfs: while let Some((v, depth)) = queue.pop_front() {
        if depth >= spec.max_depth {
            continue;
        }
        for (edge_rid, neighbor_rid) in backend.adjacency(v, spec.direction)? {
            if let Some(edge_filter) = spec.edge_filter {
                let edge_record = record_for(backend, edge_rid, true)?;
                if !edge_filter.matches(backend.catalog(), backend.txn(), edge_rid.class_id, &edge_record)? {
                    continue;
                }
            }
            if visited.contains(&neighbor_rid) {
                continue;
            }
            let vertex_record = record_for(backend, neighbor_rid, false)?;
            let admitted = match spec.vertex_filter {
                Some(f) => f.matches(backend.catalog(), backend.txn(), neighbor_rid.class_id, &vertex_record)?,
                None => true,
            };
            visited.insert(neighbor_rid);
            if !admitted {
                continue;
            }
            predecessor.insert(neighbor_rid, v);
            if neighbor_rid == dst {
                found_depth = Some(depth + 1);
                break 'bfs;
            }
            queue.push_back((neighbor_rid, depth + 1));
        }
    }

    if found_depth.is_none() {
        return Ok(Vec::new());
    }

    let mut path = vec![dst];
    let mut cursor = dst;
    while cursor != src {
        cursor = predecessor[&cursor];
        path.push(cursor);
    }
    path.reverse();

    Ok(path
        .into_iter()
        .enumerate()
        .map(|(i, rid)| RecordDescriptor::at_depth(rid, i as u16))
        .collect())
}
