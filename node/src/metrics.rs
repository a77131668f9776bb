//! Prometheus metrics for the DAIV node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that the RPC
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub datasets_submitted: IntCounter,
    pub proposals_opened: IntCounter,
    pub votes_cast: IntCounter,
    pub proposals_tallied: IntCounter,
    pub proposals_executed: IntCounter,
    /// Raw token units minted, saturating at `u64::MAX` per increment.
    pub tokens_minted: IntCounter,
    /// Operations that failed validation or storage.
    pub operations_rejected: IntCounter,
    pub store_commits: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub account_count: IntGauge,
    pub dataset_count: IntGauge,
    pub proposal_count: IntGauge,
    /// Raw token units currently held in stake escrow.
    pub escrow_held: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent inside the protocol lock per operation, in milliseconds.
    pub operation_time_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let datasets_submitted = register_int_counter_with_registry!(
            Opts::new("daiv_datasets_submitted_total", "Datasets accepted for staking"),
            registry
        )
        .expect("failed to register datasets_submitted counter");

        let proposals_opened = register_int_counter_with_registry!(
            Opts::new("daiv_proposals_opened_total", "Governance proposals opened"),
            registry
        )
        .expect("failed to register proposals_opened counter");

        let votes_cast = register_int_counter_with_registry!(
            Opts::new("daiv_votes_cast_total", "Votes recorded"),
            registry
        )
        .expect("failed to register votes_cast counter");

        let proposals_tallied = register_int_counter_with_registry!(
            Opts::new("daiv_proposals_tallied_total", "Proposal tallies performed"),
            registry
        )
        .expect("failed to register proposals_tallied counter");

        let proposals_executed = register_int_counter_with_registry!(
            Opts::new(
                "daiv_proposals_executed_total",
                "Proposals executed through the timelock"
            ),
            registry
        )
        .expect("failed to register proposals_executed counter");

        let tokens_minted = register_int_counter_with_registry!(
            Opts::new("daiv_tokens_minted_total", "Raw token units minted"),
            registry
        )
        .expect("failed to register tokens_minted counter");

        let operations_rejected = register_int_counter_with_registry!(
            Opts::new("daiv_operations_rejected_total", "Operations that returned an error"),
            registry
        )
        .expect("failed to register operations_rejected counter");

        let store_commits = register_int_counter_with_registry!(
            Opts::new("daiv_store_commits_total", "Write sets committed to the store"),
            registry
        )
        .expect("failed to register store_commits counter");

        // Gauges
        let account_count = register_int_gauge_with_registry!(
            Opts::new("daiv_account_count", "Known accounts"),
            registry
        )
        .expect("failed to register account_count gauge");

        let dataset_count = register_int_gauge_with_registry!(
            Opts::new("daiv_dataset_count", "Dataset records"),
            registry
        )
        .expect("failed to register dataset_count gauge");

        let proposal_count = register_int_gauge_with_registry!(
            Opts::new("daiv_proposal_count", "Governance proposals"),
            registry
        )
        .expect("failed to register proposal_count gauge");

        let escrow_held = register_int_gauge_with_registry!(
            Opts::new("daiv_escrow_held", "Raw token units held in stake escrow"),
            registry
        )
        .expect("failed to register escrow_held gauge");

        // Histogram – exponential buckets covering 0.05 ms → ~800 ms.
        let operation_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "daiv_operation_time_ms",
                "Time spent applying one protocol operation, in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.05, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register operation_time_ms histogram");

        Self {
            registry,
            datasets_submitted,
            proposals_opened,
            votes_cast,
            proposals_tallied,
            proposals_executed,
            tokens_minted,
            operations_rejected,
            store_commits,
            account_count,
            dataset_count,
            proposal_count,
            escrow_held,
            operation_time_ms,
        }
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a raw amount into a gauge or counter value.
pub(crate) fn clamp_i64(raw: u128) -> i64 {
    i64::try_from(raw).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lists_registered_metrics() {
        let metrics = NodeMetrics::new();
        metrics.datasets_submitted.inc();
        metrics.escrow_held.set(10);
        let text = metrics.encode().unwrap();
        assert!(text.contains("daiv_datasets_submitted_total 1"));
        assert!(text.contains("daiv_escrow_held 10"));
    }

    #[test]
    fn clamp_saturates() {
        assert_eq!(clamp_i64(5), 5);
        assert_eq!(clamp_i64(u128::MAX), i64::MAX);
    }
}
