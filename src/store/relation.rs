//! Graph Relation Store (§4.6): the IN/OUT adjacency tables kept coherent
//! with edge records. Key = packed vertex-rid; each dup-sort value is a
//! packed `(edge-rid, neighbor-rid)` pair, so enumeration at a vertex is
//! ordered primarily by edge-rid.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use heed3::{RwTxn, RoTxn};

use crate::error::Result;
use crate::ids::RecordId;
use crate::kv::{BytesDb, DbOpenFlags, KvEnv};

const DB_RELATIONS_IN: &str = "relations_in";
const DB_RELATIONS_OUT: &str = "relations_out";

/// Counts missing-edge-record inconsistencies swallowed by
/// `remove_rel_from_vertex` across the process lifetime, so repeated
/// occurrences are observable in logs without aborting the operation.
static SWALLOWED_MISSING_EDGE_COUNT: AtomicU64 = AtomicU64::new(0);

fn pack_entry(edge: RecordId, neighbor: RecordId) -> [u8; 12] {
    let mut buf = [0u8; 12];
    buf[0..6].copy_from_slice(&edge.to_packed_bytes());
    buf[6..12].copy_from_slice(&neighbor.to_packed_bytes());
    buf
}

fn unpack_entry(bytes: &[u8]) -> (RecordId, RecordId) {
    let edge = RecordId::from_packed_bytes(bytes[0..6].try_into().expect("6 bytes"));
    let neighbor = RecordId::from_packed_bytes(bytes[6..12].try_into().expect("6 bytes"));
    (edge, neighbor)
}

pub struct RelationStore {
    in_db: BytesDb,
    out_db: BytesDb,
}

impl RelationStore {
    pub fn open(env: &KvEnv, wtxn: &mut RwTxn<'_>) -> Result<Self> {
        let flags = DbOpenFlags { dup_sort: true };
        let in_db = env.open_bytes_db(wtxn, DB_RELATIONS_IN, flags)?;
        let out_db = env.open_bytes_db(wtxn, DB_RELATIONS_OUT, flags)?;
        Ok(Self { in_db, out_db })
    }

    fn insert_entry(db: &BytesDb, wtxn: &mut RwTxn<'_>, vertex: RecordId, edge: RecordId, neighbor: RecordId) -> Result<()> {
        let key = vertex.to_packed_bytes();
        let value = pack_entry(edge, neighbor);
        db.put(wtxn, &key, &value)?;
        Ok(())
    }

    fn delete_entry(db: &BytesDb, wtxn: &mut RwTxn<'_>, vertex: RecordId, edge: RecordId, neighbor: RecordId) -> Result<()> {
        let key = vertex.to_packed_bytes();
        let value = pack_entry(edge, neighbor);
        db.delete_one_duplicate(wtxn, &key, &value)?;
        Ok(())
    }

    /// Reads every dup-sort value stored at `vertex`'s key. Vertex-rid keys
    /// are fixed-width (6 bytes), so a `prefix_iter` on the exact key visits
    /// precisely that key's duplicate-value sub-tree.
    fn read_entries(db: &BytesDb, txn: &RoTxn<'_>, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
        let key = vertex.to_packed_bytes();
        let mut out = Vec::new();
        for result in db.prefix_iter(txn, &key)? {
            let (_, value) = result?;
            out.push(unpack_entry(value));
        }
        Ok(out)
    }

    fn clear_vertex(db: &BytesDb, wtxn: &mut RwTxn<'_>, vertex: RecordId) -> Result<()> {
        let key = vertex.to_packed_bytes();
        db.delete(wtxn, &key)?;
        Ok(())
    }

    /// Writes both mirror entries for a newly created edge. Both writes land
    /// in the same KV transaction by construction (§4.6 `addRel`).
    pub fn add_rel(&self, wtxn: &mut RwTxn<'_>, edge: RecordId, src: RecordId, dst: RecordId) -> Result<()> {
        Self::insert_entry(&self.out_db, wtxn, src, edge, dst)?;
        Self::insert_entry(&self.in_db, wtxn, dst, edge, src)?;
        Ok(())
    }

    pub fn update_src_rel(
        &self,
        wtxn: &mut RwTxn<'_>,
        edge: RecordId,
        old_src: RecordId,
        new_src: RecordId,
        dst: RecordId,
    ) -> Result<()> {
        Self::delete_entry(&self.out_db, wtxn, old_src, edge, dst)?;
        Self::insert_entry(&self.out_db, wtxn, new_src, edge, dst)?;
        Self::delete_entry(&self.in_db, wtxn, dst, edge, old_src)?;
        Self::insert_entry(&self.in_db, wtxn, dst, edge, new_src)?;
        Ok(())
    }

    pub fn update_dst_rel(
        &self,
        wtxn: &mut RwTxn<'_>,
        edge: RecordId,
        src: RecordId,
        old_dst: RecordId,
        new_dst: RecordId,
    ) -> Result<()> {
        Self::delete_entry(&self.in_db, wtxn, old_dst, edge, src)?;
        Self::insert_entry(&self.in_db, wtxn, new_dst, edge, src)?;
        Self::delete_entry(&self.out_db, wtxn, src, edge, old_dst)?;
        Self::insert_entry(&self.out_db, wtxn, src, edge, new_dst)?;
        Ok(())
    }

    pub fn remove_rel_from_edge(&self, wtxn: &mut RwTxn<'_>, edge: RecordId, src: RecordId, dst: RecordId) -> Result<()> {
        Self::delete_entry(&self.out_db, wtxn, src, edge, dst)?;
        Self::delete_entry(&self.in_db, wtxn, dst, edge, src)?;
        Ok(())
    }

    /// Drops every adjacency entry incident to `v`, deleting the edge
    /// records via `delete_edge_record` as it goes. `delete_edge_record`
    /// returns `Ok(true)` if a record existed and was removed, `Ok(false)` if
    /// it was already gone (swallowed here, matching §4.6's tolerance for a
    /// consistent intermediate class-drop state), or `Err` for any other
    /// failure, which propagates. Returns the set of neighbor vertex-rids so
    /// the caller can bump their versions (§4.7).
    pub fn remove_rel_from_vertex<F>(
        &self,
        wtxn: &mut RwTxn<'_>,
        v: RecordId,
        mut delete_edge_record: F,
    ) -> Result<HashSet<RecordId>>
    where
        F: FnMut(&mut RwTxn<'_>, RecordId) -> Result<bool>,
    {
        let mut neighbors = HashSet::new();

        let out_entries = Self::read_entries(&self.out_db, wtxn, v)?;
        for (edge, neighbor) in out_entries {
            if delete_edge_record(wtxn, edge)? {
                Self::delete_entry(&self.in_db, wtxn, neighbor, edge, v)?;
                neighbors.insert(neighbor);
            } else {
                let count = SWALLOWED_MISSING_EDGE_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(vertex = %v, edge = %edge, total = count, "edge record missing during vertex removal; swallowing");
            }
        }

        let in_entries = Self::read_entries(&self.in_db, wtxn, v)?;
        for (edge, neighbor) in in_entries {
            if delete_edge_record(wtxn, edge)? {
                Self::delete_entry(&self.out_db, wtxn, neighbor, edge, v)?;
                neighbors.insert(neighbor);
            } else {
                let count = SWALLOWED_MISSING_EDGE_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(vertex = %v, edge = %edge, total = count, "edge record missing during vertex removal; swallowing");
            }
        }

        Self::clear_vertex(&self.out_db, wtxn, v)?;
        Self::clear_vertex(&self.in_db, wtxn, v)?;
        Ok(neighbors)
    }

    pub fn get_out_edge_and_neighbours(&self, txn: &RoTxn<'_>, v: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
        Self::read_entries(&self.out_db, txn, v)
    }

    pub fn get_in_edge_and_neighbours(&self, txn: &RoTxn<'_>, v: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
        Self::read_entries(&self.in_db, txn, v)
    }

    pub fn get_out_edges(&self, txn: &RoTxn<'_>, v: RecordId) -> Result<Vec<RecordId>> {
        Ok(self.get_out_edge_and_neighbours(txn, v)?.into_iter().map(|(e, _)| e).collect())
    }

    pub fn get_in_edges(&self, txn: &RoTxn<'_>, v: RecordId) -> Result<Vec<RecordId>> {
        Ok(self.get_in_edge_and_neighbours(txn, v)?.into_iter().map(|(e, _)| e).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvEnvOptions;
    use tempfile::tempdir;
    use tracing_test::{logs_contain, traced_test};

    fn open() -> (tempfile::TempDir, KvEnv, RelationStore) {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let store = RelationStore::open(&env, &mut wtxn).unwrap();
        wtxn.commit().unwrap();
        (dir, env, store)
    }

    #[test]
    fn add_rel_is_visible_from_both_sides() {
        let (_dir, env, store) = open();
        let mut wtxn = env.write_txn().unwrap();
        let src = RecordId::new(1, 1);
        let dst = RecordId::new(1, 2);
        let edge = RecordId::new(2, 1);
        store.add_rel(&mut wtxn, edge, src, dst).unwrap();
        assert_eq!(store.get_out_edge_and_neighbours(&wtxn, src).unwrap(), vec![(edge, dst)]);
        assert_eq!(store.get_in_edge_and_neighbours(&wtxn, dst).unwrap(), vec![(edge, src)]);
    }

    #[test]
    fn update_dst_rel_moves_in_entry_and_keeps_out_entry_pointing_at_new_dst() {
        let (_dir, env, store) = open();
        let mut wtxn = env.write_txn().unwrap();
        let src = RecordId::new(1, 1);
        let old_dst = RecordId::new(1, 2);
        let new_dst = RecordId::new(1, 3);
        let edge = RecordId::new(2, 1);
        store.add_rel(&mut wtxn, edge, src, old_dst).unwrap();
        store.update_dst_rel(&mut wtxn, edge, src, old_dst, new_dst).unwrap();

        assert!(store.get_in_edge_and_neighbours(&wtxn, old_dst).unwrap().is_empty());
        assert_eq!(store.get_in_edge_and_neighbours(&wtxn, new_dst).unwrap(), vec![(edge, src)]);
        assert_eq!(store.get_out_edge_and_neighbours(&wtxn, src).unwrap(), vec![(edge, new_dst)]);
    }

    #[test]
    #[traced_test]
    fn remove_rel_from_vertex_swallows_missing_edge_record() {
        let (_dir, env, store) = open();
        let mut wtxn = env.write_txn().unwrap();
        let v = RecordId::new(1, 1);
        let neighbor = RecordId::new(1, 2);
        let edge = RecordId::new(2, 1);
        store.add_rel(&mut wtxn, edge, v, neighbor).unwrap();

        let neighbors = store
            .remove_rel_from_vertex(&mut wtxn, v, |_wtxn, _edge| Ok(false))
            .unwrap();
        // Edge record reported as already gone: no version bump owed, but the
        // adjacency entry at the neighbor must still not be touched since we
        // never confirmed deletion — mirror cleanup only happens on Ok(true).
        assert!(neighbors.is_empty());
        assert_eq!(store.get_in_edge_and_neighbours(&wtxn, neighbor).unwrap(), vec![(edge, v)]);
        assert!(store.get_out_edge_and_neighbours(&wtxn, v).unwrap().is_empty());
        assert!(logs_contain("edge record missing during vertex removal"));
    }

    #[test]
    fn remove_rel_from_vertex_cleans_up_confirmed_deletions() {
        let (_dir, env, store) = open();
        let mut wtxn = env.write_txn().unwrap();
        let v = RecordId::new(1, 1);
        let neighbor = RecordId::new(1, 2);
        let edge = RecordId::new(2, 1);
        store.add_rel(&mut wtxn, edge, v, neighbor).unwrap();

        let neighbors = store
            .remove_rel_from_vertex(&mut wtxn, v, |_wtxn, _edge| Ok(true))
            .unwrap();
        assert_eq!(neighbors, HashSet::from([neighbor]));
        assert!(store.get_in_edge_and_neighbours(&wtxn, neighbor).unwrap().is_empty());
        assert!(store.get_out_edge_and_neighbours(&wtxn, v).unwrap().is_empty());
    }
}
