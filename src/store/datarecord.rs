//! Data Record Store (§4.5): one sub-database per class, integer-keyed by
//! `PositionId`, with a reserved allocator key holding the next position to
//! hand out. Positions are never reused.

use heed3::{RoTxn, RwTxn};

use crate::error::Result;
use crate::ids::{ClassId, PositionId};
use crate::kv::{DbOpenFlags, KvEnv, U32Db};

/// Resolves a class's data-record table from a read-only transaction.
/// Returns `Ok(None)` when the class has never had a write-side
/// `DataRecordStore::open` call in this environment, treated by callers as
/// "class has no records yet" rather than an error.
pub fn open_existing(env: &KvEnv, rtxn: &RoTxn<'_>, class_id: ClassId) -> Result<Option<DataRecordStore>> {
    let name = class_id.to_string();
    Ok(env.open_existing_u32_db(rtxn, &name)?.map(|db| DataRecordStore { db }))
}

/// Sentinel position id reserved for the next-position allocator. Real
/// records never land here: `u32::MAX` sorts after every real position, so a
/// forward iteration naturally needs to explicitly skip it, matching §4.5
/// "iteration skips the allocator key".
const ALLOCATOR_KEY: PositionId = u32::MAX;

pub struct DataRecordStore {
    db: U32Db,
}

impl DataRecordStore {
    pub fn open(env: &KvEnv, wtxn: &mut RwTxn<'_>, class_id: ClassId) -> Result<Self> {
        let name = class_id.to_string();
        let db = env.open_u32_db(wtxn, &name, DbOpenFlags::default())?;
        let store = Self { db };
        if store.db.get(wtxn, &ALLOCATOR_KEY)?.is_none() {
            store.db.put(wtxn, &ALLOCATOR_KEY, &0u32.to_le_bytes())?;
        }
        Ok(store)
    }

    fn next_position(&self, wtxn: &mut RwTxn<'_>) -> Result<PositionId> {
        let current = self
            .db
            .get(wtxn, &ALLOCATOR_KEY)?
            .map(|b| u32::from_le_bytes(b.try_into().unwrap_or([0; 4])))
            .unwrap_or(0);
        let next = current + 1;
        self.db.put(wtxn, &ALLOCATOR_KEY, &next.to_le_bytes())?;
        Ok(current)
    }

    /// Allocates the next position id and stores `bytes` at it.
    pub fn insert(&self, wtxn: &mut RwTxn<'_>, bytes: &[u8]) -> Result<PositionId> {
        let position_id = self.next_position(wtxn)?;
        self.db.put(wtxn, &position_id, bytes)?;
        Ok(position_id)
    }

    pub fn get(&self, txn: &RoTxn<'_>, position_id: PositionId) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(txn, &position_id)?.map(|b| b.to_vec()))
    }

    /// Overwrites the record at an already-allocated position (used by
    /// `update`/partial mutators, which never relocate a record).
    pub fn put_at(&self, wtxn: &mut RwTxn<'_>, position_id: PositionId, bytes: &[u8]) -> Result<()> {
        self.db.put(wtxn, &position_id, bytes)?;
        Ok(())
    }

    pub fn remove(&self, wtxn: &mut RwTxn<'_>, position_id: PositionId) -> Result<()> {
        self.db.delete(wtxn, &position_id)?;
        Ok(())
    }

    /// Iterates all records in position-id order, skipping the allocator key.
    pub fn iter(&self, txn: &RoTxn<'_>) -> Result<Vec<(PositionId, Vec<u8>)>> {
        let mut out = Vec::new();
        for result in self.db.iter(txn)? {
            let (position_id, bytes) = result?;
            if position_id == ALLOCATOR_KEY {
                continue;
            }
            out.push((position_id, bytes.to_vec()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvEnvOptions;
    use tempfile::tempdir;

    #[test]
    fn insert_allocates_monotonic_positions_and_never_reuses() {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let store = DataRecordStore::open(&env, &mut wtxn, 1).unwrap();
        let p0 = store.insert(&mut wtxn, b"a").unwrap();
        let p1 = store.insert(&mut wtxn, b"b").unwrap();
        assert_eq!(p0, 0);
        assert_eq!(p1, 1);
        store.remove(&mut wtxn, p0).unwrap();
        let p2 = store.insert(&mut wtxn, b"c").unwrap();
        assert_eq!(p2, 2, "removed positions must not be reused");
    }

    #[test]
    fn iteration_skips_allocator_key_and_removed_records() {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let store = DataRecordStore::open(&env, &mut wtxn, 1).unwrap();
        store.insert(&mut wtxn, b"a").unwrap();
        let p1 = store.insert(&mut wtxn, b"b").unwrap();
        store.remove(&mut wtxn, p1).unwrap();
        let all = store.iter(&wtxn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1, b"a");
    }
}
