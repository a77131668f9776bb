//! Pre-built [`tracing::Span`] constructors for node operations.
//!
//! Consistent span names and fields make a single operation's log lines
//! easy to correlate.

use tracing::{info_span, Span};

/// Span covering one protocol operation applied under the context lock.
pub fn operation_span(operation: &str) -> Span {
    info_span!("op", name = %operation)
}

/// Span covering a single HTTP request handled by the RPC server.
pub fn rpc_span(method: &str, route: &str) -> Span {
    info_span!("rpc", method = %method, route = %route)
}
