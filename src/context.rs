//! Context / environment (§6): owns the LMDB environment and the two
//! catalogs that live for the process's whole interaction with one
//! database directory. Transactions borrow from a `Context`; they never
//! own their own copy of the schema catalog or relation store.

use std::path::Path;

use crate::error::Result;
use crate::kv::{KvEnv, KvEnvOptions};
use crate::schema::SchemaCatalog;
use crate::store::RelationStore;
use crate::txn::{Transaction, TxnMode};

/// Fixed at `Context::open` time; changing any of these requires reopening
/// the database (§6 "Context / environment").
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub max_dbs: u32,
    pub map_size_bytes: usize,
    pub max_readers: u32,
    /// Enables `@version` bumping on every mutation (§4.7). Off by default,
    /// an opt-in versioning flag rather than an always-on feature.
    pub versioned: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        let kv = KvEnvOptions::default();
        Self {
            max_dbs: kv.max_dbs,
            map_size_bytes: kv.map_size_bytes,
            max_readers: kv.max_readers,
            versioned: false,
        }
    }
}

/// An opened database directory: the LMDB environment plus the schema
/// catalog and relation store, both of which live for as long as the
/// `Context` does and are shared (not re-opened) by every `Transaction`.
pub struct Context {
    env: KvEnv,
    catalog: SchemaCatalog,
    relations: RelationStore,
    versioned: bool,
}

impl Context {
    pub fn open(path: &Path, options: ContextOptions) -> Result<Self> {
        let env = KvEnv::open(
            path,
            KvEnvOptions {
                max_dbs: options.max_dbs,
                map_size_bytes: options.map_size_bytes,
                max_readers: options.max_readers,
            },
        )?;
        let mut wtxn = env.write_txn()?;
        let catalog = SchemaCatalog::open(&env, &mut wtxn)?;
        let relations = RelationStore::open(&env, &mut wtxn)?;
        wtxn.commit()?;
        tracing::info!(path = %path.display(), versioned = options.versioned, "context opened");
        Ok(Self {
            env,
            catalog,
            relations,
            versioned: options.versioned,
        })
    }

    pub fn env(&self) -> &KvEnv {
        &self.env
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn relations(&self) -> &RelationStore {
        &self.relations
    }

    pub fn versioned(&self) -> bool {
        self.versioned
    }

    /// Opens a new `Transaction` against this context. A process may hold at
    /// most one live `ReadWrite` transaction at a time — `heed3`'s
    /// single-writer guarantee on `Env::write_txn` enforces this by
    /// blocking, not by an error (§5).
    pub fn begin(&self, mode: TxnMode) -> Result<Transaction<'_>> {
        Transaction::begin(self, mode)
    }

    pub fn begin_read(&self) -> Result<Transaction<'_>> {
        self.begin(TxnMode::ReadOnly)
    }

    pub fn begin_write(&self) -> Result<Transaction<'_>> {
        self.begin(TxnMode::ReadWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_catalog_and_relation_tables() {
        let dir = tempdir().unwrap();
        let ctx = Context::open(dir.path(), ContextOptions::default()).unwrap();
        let txn = ctx.begin_read().unwrap();
        assert!(txn.get_classes().unwrap().is_empty());
    }

    #[test]
    fn versioned_flag_is_carried_from_options() {
        let dir = tempdir().unwrap();
        let ctx = Context::open(dir.path(), ContextOptions { versioned: true, ..ContextOptions::default() }).unwrap();
        assert!(ctx.versioned());
    }
}
