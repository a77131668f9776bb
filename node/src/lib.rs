//! DAIV protocol node.
//!
//! Wires the token ledger, stake escrow, dataset registry, voting engine and
//! timelock into one [`ProtocolContext`]:
//! - every operation is validated and committed atomically under one lock
//! - committed changes are persisted as a single store write set
//! - change events are emitted to subscribers in commit order

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod metrics;
pub mod shutdown;
pub mod spans;
pub mod state;

pub use config::{GenesisAllocation, NodeConfig, RoleConfig};
pub use context::{ExecutionReceipt, ProtocolContext, SupplySummary};
pub use error::NodeError;
pub use events::{ChangeEvent, EntityState, EntityType, EventBus};
pub use metrics::NodeMetrics;
pub use shutdown::ShutdownController;
pub use state::ProtocolState;
