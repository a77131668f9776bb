//! Axum-based RPC server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use daiv_node::spans::rpc_span;
use daiv_node::ProtocolContext;
use tokio::net::TcpListener;
use tracing::{debug, info, Instrument};

use crate::error::RpcError;
use crate::handlers;

pub struct RpcServer {
    context: Arc<ProtocolContext>,
    enable_metrics: bool,
}

impl RpcServer {
    pub fn new(context: Arc<ProtocolContext>, enable_metrics: bool) -> Self {
        Self {
            context,
            enable_metrics,
        }
    }

    /// The full route table, bound to this server's context.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/params", get(handlers::params))
            .route("/supply", get(handlers::supply))
            .route("/accounts/:account", get(handlers::account))
            .route("/accounts/:account/balance", get(handlers::account_balance))
            .route("/transfers", post(handlers::transfer))
            .route("/delegations", post(handlers::delegate))
            .route(
                "/delegations/:account",
                axum::routing::delete(handlers::undelegate),
            )
            .route(
                "/datasets",
                get(handlers::list_datasets).post(handlers::submit_dataset),
            )
            .route("/datasets/:id", get(handlers::get_dataset))
            .route("/datasets/:id/status", get(handlers::dataset_status))
            .route("/datasets/:id/stake", get(handlers::dataset_stake))
            .route("/datasets/:id/vote", post(handlers::open_for_vote))
            .route("/datasets/:id/usage", post(handlers::record_usage))
            .route(
                "/proposals",
                get(handlers::list_proposals).post(handlers::open_proposal),
            )
            .route("/proposals/:id", get(handlers::get_proposal))
            .route("/proposals/:id/votes", post(handlers::cast_vote))
            .route("/proposals/:id/tally", post(handlers::tally_proposal))
            .route("/proposals/:id/queue", post(handlers::queue_proposal))
            .route("/proposals/:id/schedule", get(handlers::get_schedule))
            .route("/proposals/:id/execute", post(handlers::execute_proposal))
            .route("/proposals/:id/cancel", post(handlers::cancel_proposal));

        if self.enable_metrics {
            router = router.route("/metrics", get(handlers::metrics));
        }

        router
            .route_layer(middleware::from_fn(trace_request))
            .with_state(Arc::clone(&self.context))
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    pub async fn serve(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RpcError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        info!(%addr, "RPC server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("RPC server stopped");
        Ok(())
    }
}

async fn trace_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let started = Instant::now();
    async move {
        let response = next.run(request).await;
        debug!(
            status = response.status().as_u16(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "request handled"
        );
        response
    }
    .instrument(rpc_span(method.as_str(), &route))
    .await
}
