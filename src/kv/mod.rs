//! # KV Access facade
//!
//! Thin wrapper over the embedded ordered key-value engine (heed3, LMDB
//! bindings). Every other subsystem holds its sub-databases as typed
//! `heed3::Database<K, V>` fields — the facade's job is just to open them
//! with the right flags and to translate `heed3::Error` into `KvError`
//! at the boundary.
//!
//! ## Invariants
//! - Numeric-keyed databases order natively by the integer value; byte-string
//!   keyed databases order lexicographically. Both are provided by heed3
//!   directly, not reimplemented here.
//! - Dup-sort databases (`DatabaseFlags::DUP_SORT`) store every value for a
//!   given key in a sorted sub-tree; `Cursor` iterates that sub-tree in order.

use std::path::Path;

use heed3::byteorder::LE;
use heed3::types::{Bytes, U16, U32};
use heed3::{Database, DatabaseFlags, Env, EnvOpenOptions, RoTxn, RwTxn};

use crate::error::{KvError, Result};

/// Numeric key, little-endian, 16-bit width (class ids, property×class keys).
pub type U16Key = U16<LE>;
/// Numeric key, little-endian, 32-bit width (position ids, index ids packed).
pub type U32Key = U32<LE>;

/// Byte-string keyed, byte-string valued database (e.g. `classes`, text indexes).
pub type BytesDb = Database<Bytes, Bytes>;
/// Numeric (u32)-keyed, byte-string valued database (e.g. per-class data records).
pub type U32Db = Database<U32Key, Bytes>;
/// Numeric (u16)-keyed, byte-string valued database (e.g. `indexes` by packed id).
pub type U16Db = Database<U16Key, Bytes>;

/// Flags controlling how a named sub-database is opened (§4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct DbOpenFlags {
    /// Store multiple values per key in a sorted sub-tree.
    pub dup_sort: bool,
}

impl DbOpenFlags {
    pub fn to_heed_flags(self) -> DatabaseFlags {
        let mut flags = DatabaseFlags::empty();
        if self.dup_sort {
            flags |= DatabaseFlags::DUP_SORT;
        }
        flags
    }
}

/// Owns the LMDB environment (mapped file + reader table). Shared across
/// `Transaction`s via a cheap clone; ref-counting is handled by `heed3::Env`'s
/// own `Clone` impl.
#[derive(Clone)]
pub struct KvEnv {
    env: Env,
}

/// Fixed at open time (§6 Context/environment); changing any of these
/// requires reopening the database.
#[derive(Debug, Clone, Copy)]
pub struct KvEnvOptions {
    pub max_dbs: u32,
    pub map_size_bytes: usize,
    pub max_readers: u32,
}

impl Default for KvEnvOptions {
    fn default() -> Self {
        Self {
            max_dbs: 64,
            map_size_bytes: 10 * 1024 * 1024 * 1024,
            max_readers: 126,
        }
    }
}

impl KvEnv {
    pub fn open(path: &Path, options: KvEnvOptions) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(options.map_size_bytes)
                .max_dbs(options.max_dbs)
                .max_readers(options.max_readers)
                .open(path)?
        };
        Ok(Self { env })
    }

    pub fn read_txn(&self) -> Result<RoTxn<'_>> {
        Ok(self.env.read_txn().map_err(KvError::from)?)
    }

    pub fn write_txn(&self) -> Result<RwTxn<'_>> {
        Ok(self.env.write_txn().map_err(KvError::from)?)
    }

    /// Opens (creating if absent) a byte-string keyed, byte-string valued
    /// sub-database. Used by the schema catalog and text indexes.
    pub fn open_bytes_db(
        &self,
        wtxn: &mut RwTxn<'_>,
        name: &str,
        flags: DbOpenFlags,
    ) -> Result<BytesDb> {
        Ok(self
            .env
            .database_options()
            .types::<Bytes, Bytes>()
            .flags(flags.to_heed_flags())
            .name(name)
            .create(wtxn)
            .map_err(KvError::from)?)
    }

    /// Opens a u32-numeric-keyed database. Used by per-class data record
    /// stores (keyed by `PositionId`) and numeric secondary indexes.
    pub fn open_u32_db(
        &self,
        wtxn: &mut RwTxn<'_>,
        name: &str,
        flags: DbOpenFlags,
    ) -> Result<U32Db> {
        Ok(self
            .env
            .database_options()
            .types::<U32Key, Bytes>()
            .flags(flags.to_heed_flags())
            .name(name)
            .create(wtxn)
            .map_err(KvError::from)?)
    }

    /// Opens a u16-numeric-keyed database. Used by the `indexes` catalog
    /// table (key = packed `(classId<<16)|propertyId`, stored as u32 really —
    /// see `crate::schema::catalog`; this helper is kept for true 16-bit keys
    /// such as per-class counters).
    pub fn open_u16_db(
        &self,
        wtxn: &mut RwTxn<'_>,
        name: &str,
        flags: DbOpenFlags,
    ) -> Result<U16Db> {
        Ok(self
            .env
            .database_options()
            .types::<U16Key, Bytes>()
            .flags(flags.to_heed_flags())
            .name(name)
            .create(wtxn)
            .map_err(KvError::from)?)
    }

    /// Opens an already-created byte-string keyed sub-database under a
    /// read-only transaction, returning `None` if it has never been
    /// created. Used by read-only `Transaction`s (§4.12, §5 "a process may
    /// hold at most one active read-write Transaction") to resolve a
    /// per-class or per-index table without needing write access.
    pub fn open_existing_bytes_db(&self, rtxn: &RoTxn<'_>, name: &str) -> Result<Option<BytesDb>> {
        Ok(self
            .env
            .database_options()
            .types::<Bytes, Bytes>()
            .name(name)
            .open(rtxn)
            .map_err(KvError::from)?)
    }

    /// Read-only counterpart to `open_u32_db`.
    pub fn open_existing_u32_db(&self, rtxn: &RoTxn<'_>, name: &str) -> Result<Option<U32Db>> {
        Ok(self
            .env
            .database_options()
            .types::<U32Key, Bytes>()
            .name(name)
            .open(rtxn)
            .map_err(KvError::from)?)
    }
}

/// Translates a `KEY_EXIST` put failure into `Ok(())` when the existing value
/// already matches, and into `Err(KvError::KeyExist)` otherwise — makes a
/// unique insert idempotent under retry.
pub fn put_unique(db: &BytesDb, wtxn: &mut RwTxn<'_>, key: &[u8], value: &[u8]) -> Result<()> {
    match db.put_with_flags(wtxn, heed3::PutFlags::NO_OVERWRITE, key, value) {
        Ok(()) => Ok(()),
        Err(heed3::Error::Mdb(heed3::MdbError::KeyExist)) => {
            let existing = db.get(wtxn, key).map_err(KvError::from)?;
            if existing.as_deref() == Some(value) {
                Ok(())
            } else {
                Err(KvError::KeyExist.into())
            }
        }
        Err(e) => Err(KvError::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_and_roundtrip_bytes_db() {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let db = env
            .open_bytes_db(&mut wtxn, "test", DbOpenFlags::default())
            .unwrap();
        db.put(&mut wtxn, b"k", b"v").unwrap();
        wtxn.commit().unwrap();

        let rtxn = env.read_txn().unwrap();
        assert_eq!(db.get(&rtxn, b"k").unwrap(), Some(&b"v"[..]));
        assert_eq!(db.get(&rtxn, b"missing").unwrap(), None);
    }

    #[test]
    fn put_unique_rejects_conflicting_value_but_allows_repeat() {
        let dir = tempdir().unwrap();
        let env = KvEnv::open(dir.path(), KvEnvOptions::default()).unwrap();
        let mut wtxn = env.write_txn().unwrap();
        let db = env
            .open_bytes_db(&mut wtxn, "uniq", DbOpenFlags::default())
            .unwrap();
        put_unique(&db, &mut wtxn, b"k", b"v1").unwrap();
        // Same value again is idempotent.
        put_unique(&db, &mut wtxn, b"k", b"v1").unwrap();
        // Different value collides.
        let err = put_unique(&db, &mut wtxn, b"k", b"v2").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);
    }
}
