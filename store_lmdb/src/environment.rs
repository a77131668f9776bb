//! LMDB environment setup and the [`StateStore`] implementation.
//!
//! A [`WriteSet`] is applied inside a single `RwTxn`; if any operation fails
//! the transaction is dropped without committing, so nothing becomes visible.

use std::collections::BTreeMap;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::{debug, info};

use daiv_store::{StateStore, StoreError, Table, WriteOp, WriteSet};

use crate::LmdbError;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and one database handle per table.
pub struct LmdbEnvironment {
    env: Env,
    dbs: BTreeMap<Table, Database<Bytes, Bytes>>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating every
    /// table database that does not exist yet.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path and
        // the memory map is never accessed outside heed's transaction API.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut dbs = BTreeMap::new();
        for table in Table::ALL {
            let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(table.name()))?;
            dbs.insert(table, db);
        }
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self { env, dbs })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    fn db(&self, table: Table) -> Result<Database<Bytes, Bytes>, LmdbError> {
        self.dbs
            .get(&table)
            .copied()
            .ok_or(LmdbError::MissingDatabase(table.name()))
    }
}

impl StateStore for LmdbEnvironment {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = db.get(&rtxn, key).map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in db.iter(&rtxn).map_err(LmdbError::from)? {
            let (k, v) = entry.map_err(LmdbError::from)?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn commit(&self, set: WriteSet) -> Result<(), StoreError> {
        if set.is_empty() {
            return Ok(());
        }
        let n = set.len();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in set.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => {
                    self.db(table)?
                        .put(&mut wtxn, &key, &value)
                        .map_err(LmdbError::from)?;
                }
                WriteOp::Delete { table, key } => {
                    self.db(table)?
                        .delete(&mut wtxn, &key)
                        .map_err(LmdbError::from)?;
                }
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        debug!(ops = n, "committed write set");
        Ok(())
    }
}
