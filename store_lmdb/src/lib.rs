//! LMDB storage backend for the DAIV protocol.
//!
//! Implements [`daiv_store::StateStore`] using the `heed` LMDB bindings.
//! Each logical table maps to one named LMDB database within a single environment.

pub mod environment;
pub mod error;
pub mod integrity;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
