//! Nullable store: thread-safe in-memory storage for testing.

use daiv_store::{StateStore, StoreError, Table, WriteOp, WriteSet};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

type Tables = BTreeMap<Table, BTreeMap<Vec<u8>, Vec<u8>>>;

/// An in-memory [`StateStore`].
///
/// `fail_next_commit` makes the next commit return a backend error without
/// applying anything, for exercising store-failure paths.
pub struct NullStore {
    tables: Mutex<Tables>,
    fail_next: AtomicBool,
    commits: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(BTreeMap::new()),
            fail_next: AtomicBool::new(false),
            commits: AtomicU64::new(0),
        }
    }

    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for NullStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .lock()
            .get(&table)
            .and_then(|t| t.get(key))
            .cloned())
    }

    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()
            .get(&table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn commit(&self, set: WriteSet) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut tables = self.lock();
        for op in set.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => {
                    tables.entry(table).or_default().insert(key, value);
                }
                WriteOp::Delete { table, key } => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.remove(&key);
                    }
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_applies_all_ops() {
        let store = NullStore::new();
        let mut set = WriteSet::new();
        set.put(Table::Accounts, b"a", &1u64).unwrap();
        set.put(Table::Accounts, b"b", &2u64).unwrap();
        store.commit(set).unwrap();
        assert_eq!(store.count(Table::Accounts).unwrap(), 2);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn injected_failure_applies_nothing() {
        let store = NullStore::new();
        store.fail_next_commit();
        let mut set = WriteSet::new();
        set.put(Table::Accounts, b"a", &1u64).unwrap();
        assert!(store.commit(set).is_err());
        assert_eq!(store.count(Table::Accounts).unwrap(), 0);

        let mut set = WriteSet::new();
        set.put(Table::Accounts, b"a", &1u64).unwrap();
        store.commit(set).unwrap();
        assert_eq!(store.count(Table::Accounts).unwrap(), 1);
    }
}
