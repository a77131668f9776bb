//! Dataset registry for the DAIV protocol.
//!
//! Tracks every submitted dataset from its staked submission through the
//! approval vote to its final admission decision, and pays base and
//! usage-based rewards for admitted datasets.

pub mod error;
pub mod record;
pub mod registry;

pub use error::RegistryError;
pub use record::{DatasetFilter, DatasetMetadata, DatasetRecord, Outcome, Submission};
pub use registry::DatasetRegistry;
