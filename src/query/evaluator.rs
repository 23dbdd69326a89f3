//! Query Evaluator (§4.10): turns a `find(class)[.where(...)][.indexed()]`
//! request into either a full scan or an indexed lookup, and combines
//! `MultiCondition` leaf results under set AND/OR.

use std::collections::BTreeSet;

use heed3::RoTxn;

use crate::error::Result;
use crate::ids::{ClassId, PositionId, RecordDescriptor, RecordId};
use crate::record::Record;
use crate::schema::SchemaCatalog;

use super::condition::Comparator;
use super::filter::GraphFilter;
use super::multi_condition::{BoolOp, Leaf, Node};

/// The storage surface the evaluator needs. Implemented by the transaction
/// layer, which owns the per-class `DataRecordStore`s and per-index
/// `SecondaryIndex`es this trait abstracts over — keeping the evaluator
/// itself free of any particular wiring to those caches.
pub trait QueryBackend {
    fn catalog(&self) -> &SchemaCatalog;
    fn txn(&self) -> &RoTxn<'_>;

    /// All live positions in a class's data-record table, in PositionId order.
    fn scan_positions(&self, class_id: ClassId) -> Result<Vec<PositionId>>;

    fn get_record(&self, class_id: ClassId, position_id: PositionId) -> Result<Option<Record>>;

    /// `Some` only when an index exists on `(class_id, property_name)`.
    fn index_equal_lookup(
        &self,
        class_id: ClassId,
        property_name: &str,
        condition: &super::condition::Condition,
    ) -> Result<Option<Vec<PositionId>>>;
}

fn classes_in_scope(
    backend: &impl QueryBackend,
    class_id: ClassId,
    include_subclasses: bool,
) -> Result<Vec<ClassId>> {
    let mut classes = vec![class_id];
    if include_subclasses {
        classes.extend(backend.catalog().get_descendant_classes(backend.txn(), class_id)?);
    }
    Ok(classes)
}

fn full_scan(
    backend: &impl QueryBackend,
    class_id: ClassId,
    include_subclasses: bool,
    filter: Option<&GraphFilter>,
) -> Result<Vec<RecordDescriptor>> {
    let mut out = Vec::new();
    for scoped_class in classes_in_scope(backend, class_id, include_subclasses)? {
        for position_id in backend.scan_positions(scoped_class)? {
            let Some(record) = backend.get_record(scoped_class, position_id)? else {
                continue;
            };
            let admitted = match filter {
                Some(f) => f.matches(backend.catalog(), backend.txn(), scoped_class, &record)?,
                None => true,
            };
            if admitted {
                out.push(RecordDescriptor::new(RecordId::new(scoped_class, position_id)));
            }
        }
    }
    Ok(out)
}

/// Attempts the single-condition indexed fast path. Returns `None` when the
/// condition isn't indexable, so the caller can fall back to a scan.
fn try_indexed_single(
    backend: &impl QueryBackend,
    class_id: ClassId,
    condition: &super::condition::Condition,
) -> Result<Option<Vec<RecordId>>> {
    if !condition.comparator.is_planner_indexable() || condition.negative {
        return Ok(None);
    }
    let hits = backend.index_equal_lookup(class_id, &condition.property_name, condition)?;
    Ok(hits.map(|positions| positions.into_iter().map(|p| RecordId::new(class_id, p)).collect()))
}

/// Bottom-up attempt to resolve a `MultiCondition` tree entirely from
/// indexes. `None` at any node forces the whole tree to fall back to a scan
/// (§4.10: "indexable only if every leaf is a Condition AND every property
/// involved has an index supporting that leaf's comparator").
fn try_indexed_tree(
    backend: &impl QueryBackend,
    class_id: ClassId,
    node: &Node,
) -> Result<Option<BTreeSet<RecordId>>> {
    match node {
        Node::Leaf(Leaf::Predicate(_)) => Ok(None),
        Node::Leaf(Leaf::Condition(c)) => {
            Ok(try_indexed_single(backend, class_id, c)?.map(|v| v.into_iter().collect()))
        }
        Node::Branch { op, negative, left, right } => {
            let (Some(l), Some(r)) = (
                try_indexed_tree(backend, class_id, left)?,
                try_indexed_tree(backend, class_id, right)?,
            ) else {
                return Ok(None);
            };
            let effective_op = if *negative {
                match op {
                    BoolOp::And => BoolOp::Or,
                    BoolOp::Or => BoolOp::And,
                }
            } else {
                *op
            };
            let combined = match effective_op {
                BoolOp::And => l.intersection(&r).copied().collect(),
                BoolOp::Or => l.union(&r).copied().collect(),
            };
            Ok(Some(combined))
        }
    }
}

/// Entry point for `find(class)[.where(...)][.indexed()]` (§4.10).
///
/// `indexed_only` mirrors `.indexed()`: when the condition cannot be served
/// from an index, return an empty result instead of falling back to a scan.
pub fn find(
    backend: &impl QueryBackend,
    class_id: ClassId,
    include_subclasses: bool,
    filter: Option<&GraphFilter>,
    indexed_only: bool,
) -> Result<Vec<RecordDescriptor>> {
    let node = filter.and_then(|f| f.node.as_ref());

    let indexed = match node {
        None => None,
        Some(Node::Leaf(Leaf::Condition(c))) => {
            try_indexed_single(backend, class_id, c)?.map(|v| v.into_iter().collect::<BTreeSet<_>>())
        }
        Some(tree @ Node::Branch { .. }) => try_indexed_tree(backend, class_id, tree)?,
        Some(Node::Leaf(Leaf::Predicate(_))) => None,
    };

    if let Some(hits) = indexed {
        let mut out: Vec<_> = hits.into_iter().map(RecordDescriptor::new).collect();
        out.sort_by_key(|d| d.record_id);
        return Ok(out);
    }

    if indexed_only {
        return Ok(Vec::new());
    }

    full_scan(backend, class_id, include_subclasses, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvEnv, KvEnvOptions};
    use crate::query::condition::Condition;
    use crate::schema::ClassType;
    use crate::value::{PropertyType, Value};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FakeBackend<'a> {
        catalog: &'a SchemaCatalog,
        txn: &'a RoTxn<'a>,
        data: RefCell<HashMap<ClassId, Vec<(PositionId, Record)>>>,
    }

    impl<'a> QueryBackend for FakeBackend<'a> {
        fn catalog(&self) -> &SchemaCatalog {
            self.catalog
        }
        fn txn(&self) -> &RoTxn<'_> {
            self.txn
        }
        fn scan_positions(&self, class_id: ClassId) -> Result<Vec<PositionId>> {
            Ok(self.data.borrow().get(&class_id).map(|v| v.iter().map(|(p, _)| *p).collect()).unwrap_or_default())
        }
        fn get_record(&self, class_id: ClassId, position_id: PositionId) -> Result<Option<Record>> {
            Ok(self
                .data
                .borrow()
                .get(&class_id)
                .and_then(|v| v.iter().find(|(p, _)| *p == position_id))
                .map(|(_, r)| r.clone()))
        }
        fn index_equal_lookup(
            &self,
            class_id: ClassId,
            property_name: &str,
            condition: &Condition,
        ) -> Result<Option<Vec<PositionId>>> {
            // No indexes in the fake backend: always force a scan.
            let _ = (class_id, property_name, condition);
            Ok(None)
        }
    }

    fn setup() -> (tempfile::TempDir, KvEnv, SchemaCatalog, ClassId) {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let catalog = SchemaCatalog::open(&env, &mut wtxn).unwrap();
        let class = catalog.add_class(&mut wtxn, "N", 0, ClassType::Vertex).unwrap();
        catalog.add_property(&mut wtxn, class.id, "k", PropertyType::Integer).unwrap();
        wtxn.commit().unwrap();
        (dir, env, catalog, class.id)
    }

    #[test]
    fn full_scan_with_greater_condition_matches_scenario_3() {
        let (_dir, env, catalog, class_id) = setup();
        let txn = env.read_txn().unwrap();
        let mut data = HashMap::new();
        let mut records = Vec::new();
        for (pos, k) in [(0u32, -5), (1, 0), (2, 10)] {
            let mut r = Record::new();
            r.set("k", Value::Integer(k)).unwrap();
            records.push((pos, r));
        }
        data.insert(class_id, records);
        let backend = FakeBackend { catalog: &catalog, txn: &txn, data: RefCell::new(data) };

        let condition = Condition::new("k", Comparator::Greater).with_value(Value::Integer(-1));
        let filter = GraphFilter::new(Some(Node::leaf(condition)), Default::default());
        let hits = find(&backend, class_id, false, Some(&filter), false).unwrap();
        let positions: Vec<_> = hits.iter().map(|d| d.record_id.position_id).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn indexed_only_with_non_indexable_condition_returns_empty() {
        let (_dir, env, catalog, class_id) = setup();
        let txn = env.read_txn().unwrap();
        let backend = FakeBackend { catalog: &catalog, txn: &txn, data: RefCell::new(HashMap::new()) };
        let condition = Condition::new("k", Comparator::Greater).with_value(Value::Integer(0));
        let filter = GraphFilter::new(Some(Node::leaf(condition)), Default::default());
        let hits = find(&backend, class_id, false, Some(&filter), true).unwrap();
        assert!(hits.is_empty());
    }
}
