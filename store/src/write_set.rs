//! Write sets: group several record writes into one atomic commit.
//!
//! # Usage
//!
//! ```ignore
//! let mut set = WriteSet::new();
//! set.put(Table::Datasets, id.to_key(), &record)?;
//! set.put(Table::Stakes, id.to_key(), &stake)?;
//! store.commit(set)?;
//! ```

use serde::Serialize;

use crate::{encode, StoreError, Table};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        table: Table,
        key: Vec<u8>,
    },
}

/// An ordered list of writes applied atomically by [`crate::StateStore::commit`].
#[derive(Clone, Debug, Default)]
pub struct WriteSet {
    ops: Vec<WriteOp>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put of an encoded record.
    pub fn put<T: Serialize>(
        &mut self,
        table: Table,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<(), StoreError> {
        self.ops.push(WriteOp::Put {
            table,
            key: key.as_ref().to_vec(),
            value: encode(value)?,
        });
        Ok(())
    }

    /// Queue a delete.
    pub fn delete(&mut self, table: Table, key: impl AsRef<[u8]>) {
        self.ops.push(WriteOp::Delete {
            table,
            key: key.as_ref().to_vec(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
