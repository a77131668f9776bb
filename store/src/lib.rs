//! Abstract storage traits for the DAIV protocol.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`StateStore`]. The rest of the codebase depends only on the trait.
//!
//! Entities are stored as opaque bincode blobs keyed by their stable id, one
//! table per entity type. Typed helpers ([`encode`], [`decode`], [`load_all`])
//! live here so backends stay ignorant of domain types.

pub mod error;
pub mod table;
pub mod write_set;

pub use error::StoreError;
pub use table::Table;
pub use write_set::{WriteOp, WriteSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Durable keyed-record storage.
pub trait StateStore: Send + Sync {
    /// Get a single record.
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// All records of a table, in key order.
    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Number of records in a table.
    fn count(&self, table: Table) -> Result<u64, StoreError> {
        self.iter(table).map(|v| v.len() as u64)
    }

    /// Apply every operation in the set atomically: all or none become visible.
    fn commit(&self, set: WriteSet) -> Result<(), StoreError>;
}

/// Encode a record for storage.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

/// Decode a stored record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Decode every record in a table.
pub fn load_all<T: DeserializeOwned>(
    store: &dyn StateStore,
    table: Table,
) -> Result<Vec<T>, StoreError> {
    store
        .iter(table)?
        .iter()
        .map(|(_, v)| decode(v))
        .collect()
}

/// Read and decode a meta value.
pub fn get_meta<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(Table::Meta, key.as_bytes())?
        .map(|bytes| decode(&bytes))
        .transpose()
}
