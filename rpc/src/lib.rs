//! JSON-over-HTTP server for the DAIV node.
//!
//! Provides endpoints for:
//! - Account balances, transfers and delegation
//! - Dataset submission, approval votes and usage reports
//! - Governance proposals, voting, tally, timelock queue/execute/cancel
//! - Protocol parameters, token supply and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use server::RpcServer;
