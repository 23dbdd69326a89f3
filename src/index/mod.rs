//! Secondary Index Store (§4.8): one logical index per (class, property),
//! backed by one or two sub-databases depending on whether the property is
//! numeric (split by sign) or text.

use heed3::{PutFlags, RoTxn, RwTxn};

use crate::error::{EngineError, IndexError, KvError, Result};
use crate::ids::{IndexId, PositionId};
use crate::kv::{BytesDb, DbOpenFlags, KvEnv};
use crate::value::{PropertyType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexKind {
    Numeric,
    Text,
}

/// Encodes an `f64` magnitude as a big-endian byte key so that lexicographic
/// ordering of the bytes matches ascending numeric ordering of the
/// magnitude (a standard property of IEEE-754 bit patterns for non-negative
/// floats). Sign is handled by which of the two sub-dbs the key lives in.
fn magnitude_key(value: f64) -> [u8; 8] {
    value.abs().to_bits().to_be_bytes()
}

pub struct SecondaryIndex {
    kind: IndexKind,
    unique: bool,
    /// Text index's only table, or the numeric index's non-negative half.
    positive_db: BytesDb,
    /// `Some` only for a numeric index: the negative half (`idx_{id}_n`).
    negative_db: Option<BytesDb>,
}

impl SecondaryIndex {
    pub fn open(
        env: &KvEnv,
        wtxn: &mut RwTxn<'_>,
        index_id: IndexId,
        property_type: PropertyType,
        unique: bool,
    ) -> Result<Self> {
        if !property_type.is_indexable() {
            return Err(IndexError::InvalidPropTypeIndex.into());
        }
        let kind = if property_type.is_numeric() {
            IndexKind::Numeric
        } else {
            IndexKind::Text
        };
        let flags = DbOpenFlags { dup_sort: !unique };
        let positive_db = env.open_bytes_db(wtxn, &format!("idx_{index_id}"), flags)?;
        let negative_db = match kind {
            IndexKind::Numeric => Some(env.open_bytes_db(wtxn, &format!("idx_{index_id}_n"), flags)?),
            IndexKind::Text => None,
        };
        Ok(Self {
            kind,
            unique,
            positive_db,
            negative_db,
        })
    }

    fn encode_key(&self, value: &Value) -> Result<(bool, Vec<u8>)> {
        match self.kind {
            IndexKind::Numeric => {
                let f = value
                    .as_f64()
                    .ok_or(IndexError::InvalidPropTypeIndex)?;
                Ok((f < 0.0, magnitude_key(f).to_vec()))
            }
            IndexKind::Text => {
                let s = value
                    .as_text()
                    .ok_or(IndexError::InvalidPropTypeIndex)?;
                Ok((false, s.as_bytes().to_vec()))
            }
        }
    }

    /// Resolves an already-created index from a read-only transaction.
    /// Returns `Ok(None)` when the index's sub-dbs have never been created
    /// in this environment.
    pub fn open_existing(
        env: &KvEnv,
        rtxn: &RoTxn<'_>,
        index_id: IndexId,
        property_type: PropertyType,
        unique: bool,
    ) -> Result<Option<Self>> {
        let kind = if property_type.is_numeric() {
            IndexKind::Numeric
        } else {
            IndexKind::Text
        };
        let Some(positive_db) = env.open_existing_bytes_db(rtxn, &format!("idx_{index_id}"))? else {
            return Ok(None);
        };
        let negative_db = match kind {
            IndexKind::Numeric => env.open_existing_bytes_db(rtxn, &format!("idx_{index_id}_n"))?,
            IndexKind::Text => None,
        };
        Ok(Some(Self {
            kind,
            unique,
            positive_db,
            negative_db,
        }))
    }

    fn db_for_sign(&self, negative: bool) -> &BytesDb {
        if negative {
            self.negative_db.as_ref().expect("negative sub-db only absent for text indexes")
        } else {
            &self.positive_db
        }
    }

    /// Inserts `position_id` under `value`'s encoded key. A unique-index key
    /// collision surfaces as `UNIQUE_CONSTRAINT` (§4.8).
    pub fn insert(&self, wtxn: &mut RwTxn<'_>, value: &Value, position_id: PositionId) -> Result<()> {
        let (negative, key) = self.encode_key(value)?;
        let db = self.db_for_sign(negative);
        let bytes = position_id.to_le_bytes();
        if self.unique {
            match db.put_with_flags(wtxn, PutFlags::NO_OVERWRITE, &key, &bytes) {
                Ok(()) => Ok(()),
                Err(heed3::Error::Mdb(heed3::MdbError::KeyExist)) => {
                    Err(IndexError::UniqueConstraint(format!("{value:?}")).into())
                }
                Err(e) => Err(KvError::from(e).into()),
            }
        } else {
            db.put(wtxn, &key, &bytes)?;
            Ok(())
        }
    }

    /// Removes the `(key, position_id)` pair. Required on dup-sort sub-dbs
    /// because a key may address several positions.
    pub fn delete(&self, wtxn: &mut RwTxn<'_>, value: &Value, position_id: PositionId) -> Result<()> {
        let (negative, key) = self.encode_key(value)?;
        let db = self.db_for_sign(negative);
        if self.unique {
            db.delete(wtxn, &key)?;
        } else {
            db.delete_one_duplicate(wtxn, &key, &position_id.to_le_bytes())?;
        }
        Ok(())
    }

    /// All position ids stored under `value`'s exact key (the planner's
    /// `EQUAL` fast path, §4.10).
    pub fn get_equal(&self, txn: &RoTxn<'_>, value: &Value) -> Result<Vec<PositionId>> {
        let (negative, key) = self.encode_key(value)?;
        let db = self.db_for_sign(negative);
        let mut out = Vec::new();
        for result in db.prefix_iter(txn, &key)? {
            let (_, bytes) = result?;
            out.push(u32::from_le_bytes(bytes.try_into().map_err(|_| {
                EngineError::Internal("malformed index value".into())
            })?));
        }
        Ok(out)
    }

    /// Feeds every non-null `(position_id, value)` pair through `insert`,
    /// used when an index is created over a class that already has data
    /// (§4.8 "Creation over existing data"). A uniqueness violation found
    /// during this scan is reported as `INVALID_INDEX_CONSTRAINT` rather
    /// than `UNIQUE_CONSTRAINT`, since it means the existing data — not a
    /// new write — breaks the constraint.
    pub fn build_over_existing<I>(&self, wtxn: &mut RwTxn<'_>, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (PositionId, Value)>,
    {
        for (position_id, value) in entries {
            if value.is_null() {
                continue;
            }
            match self.insert(wtxn, &value, position_id) {
                Ok(()) => {}
                Err(EngineError::Index(IndexError::UniqueConstraint(msg))) => {
                    return Err(IndexError::InvalidIndexConstraint(msg).into());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvEnvOptions;
    use tempfile::tempdir;

    fn open_index(unique: bool, property_type: PropertyType) -> (tempfile::TempDir, KvEnv, SecondaryIndex) {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let index = SecondaryIndex::open(&env, &mut wtxn, 1, property_type, unique).unwrap();
        wtxn.commit().unwrap();
        (dir, env, index)
    }

    #[test]
    fn numeric_index_splits_by_sign_and_resolves_equal() {
        let (_dir, env, index) = open_index(true, PropertyType::Integer);
        let mut wtxn = env.write_txn().unwrap();
        index.insert(&mut wtxn, &Value::Integer(1), 0).unwrap();
        index.insert(&mut wtxn, &Value::Integer(-1), 1).unwrap();
        index.insert(&mut wtxn, &Value::Integer(2), 2).unwrap();

        assert_eq!(index.get_equal(&wtxn, &Value::Integer(1)).unwrap(), vec![0]);
        assert_eq!(index.get_equal(&wtxn, &Value::Integer(-1)).unwrap(), vec![1]);
        assert_eq!(index.get_equal(&wtxn, &Value::Integer(2)).unwrap(), vec![2]);
    }

    #[test]
    fn unique_numeric_index_rejects_duplicate_key() {
        let (_dir, env, index) = open_index(true, PropertyType::Integer);
        let mut wtxn = env.write_txn().unwrap();
        index.insert(&mut wtxn, &Value::Integer(1), 0).unwrap();
        let err = index.insert(&mut wtxn, &Value::Integer(1), 1).unwrap_err();
        assert!(matches!(err, EngineError::Index(IndexError::UniqueConstraint(_))));
    }

    #[test]
    fn non_unique_text_index_allows_multiple_positions_per_key() {
        let (_dir, env, index) = open_index(false, PropertyType::Text);
        let mut wtxn = env.write_txn().unwrap();
        index.insert(&mut wtxn, &Value::Text("a".into()), 0).unwrap();
        index.insert(&mut wtxn, &Value::Text("a".into()), 1).unwrap();
        let mut got = index.get_equal(&wtxn, &Value::Text("a".into())).unwrap();
        got.sort();
        assert_eq!(got, vec![0, 1]);
    }

    #[test]
    fn delete_removes_only_the_matching_position() {
        let (_dir, env, index) = open_index(false, PropertyType::Text);
        let mut wtxn = env.write_txn().unwrap();
        index.insert(&mut wtxn, &Value::Text("a".into()), 0).unwrap();
        index.insert(&mut wtxn, &Value::Text("a".into()), 1).unwrap();
        index.delete(&mut wtxn, &Value::Text("a".into()), 0).unwrap();
        assert_eq!(index.get_equal(&wtxn, &Value::Text("a".into())).unwrap(), vec![1]);
    }

    #[test]
    fn build_over_existing_reports_invalid_index_constraint_on_conflict() {
        let (_dir, env, index) = open_index(true, PropertyType::Integer);
        let mut wtxn = env.write_txn().unwrap();
        let entries = vec![(0u32, Value::Integer(1)), (1u32, Value::Integer(1))];
        let err = index.build_over_existing(&mut wtxn, entries).unwrap_err();
        assert!(matches!(err, EngineError::Index(IndexError::InvalidIndexConstraint(_))));
    }

    #[test]
    fn build_over_existing_skips_null_values() {
        let (_dir, env, index) = open_index(false, PropertyType::Integer);
        let mut wtxn = env.write_txn().unwrap();
        let entries = vec![(0u32, Value::Null), (1u32, Value::Integer(5))];
        index.build_over_existing(&mut wtxn, entries).unwrap();
        assert_eq!(index.get_equal(&wtxn, &Value::Integer(5)).unwrap(), vec![1]);
    }

    #[test]
    fn blob_property_type_is_rejected_at_open() {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let err = SecondaryIndex::open(&env, &mut wtxn, 1, PropertyType::Blob, false).unwrap_err();
        assert!(matches!(err, EngineError::Index(IndexError::InvalidPropTypeIndex)));
    }
}
