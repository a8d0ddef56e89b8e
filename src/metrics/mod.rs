// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Event ingestion (accepted, rejected by reason)
// - DAL statements (count by verb and outcome, latency)
// - Store reachability as seen by the health check
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Ingestion Metrics
    pub events_received: IntCounter,
    pub events_rejected: IntCounterVec,

    // DAL Metrics
    pub statements: IntCounterVec,
    pub statement_duration: HistogramVec,

    // Store Metrics
    pub store_up: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_received = IntCounter::new(
            "gateway_events_received_total",
            "Total events accepted and stored",
        )?;
        registry.register(Box::new(events_received.clone()))?;

        let events_rejected = IntCounterVec::new(
            Opts::new("gateway_events_rejected_total", "Total events rejected"),
            &["reason"],
        )?;
        registry.register(Box::new(events_rejected.clone()))?;

        let statements = IntCounterVec::new(
            Opts::new("dal_statements_total", "Total DAL statements by verb and outcome"),
            &["op", "outcome"],
        )?;
        registry.register(Box::new(statements.clone()))?;

        let statement_duration = HistogramVec::new(
            HistogramOpts::new("dal_statement_duration_seconds", "DAL statement duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["op"],
        )?;
        registry.register(Box::new(statement_duration.clone()))?;

        let store_up = IntGauge::new("store_up", "Store reachable at last health check (0/1)")?;
        registry.register(Box::new(store_up.clone()))?;

        Ok(Self {
            registry,
            events_received,
            events_rejected,
            statements,
            statement_duration,
            store_up,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_statement(&self, op: &str, outcome: &str, duration_secs: f64) {
        self.statements.with_label_values(&[op, outcome]).inc();
        self.statement_duration.with_label_values(&[op]).observe(duration_secs);
    }

    pub fn record_event_received(&self) {
        self.events_received.inc();
    }

    pub fn record_event_rejected(&self, reason: &str) {
        self.events_rejected.with_label_values(&[reason]).inc();
    }

    pub fn set_store_up(&self, up: bool) {
        self.store_up.set(i64::from(up));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_statement() {
        let metrics = Metrics::new().unwrap();
        metrics.record_statement("create", "ok", 0.002);
        metrics.record_statement("create", "error", 0.004);
        metrics.record_statement("read", "ok", 0.001);

        assert_eq!(metrics.statements.with_label_values(&["create", "ok"]).get(), 1);
        assert_eq!(metrics.statements.with_label_values(&["create", "error"]).get(), 1);
        assert_eq!(
            metrics.statement_duration.with_label_values(&["create"]).get_sample_count(),
            2
        );
    }

    #[test]
    fn test_record_rejections_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_event_rejected("malformed");
        metrics.record_event_rejected("malformed");
        metrics.record_event_rejected("store");

        assert_eq!(metrics.events_rejected.with_label_values(&["malformed"]).get(), 2);
        assert_eq!(metrics.events_rejected.with_label_values(&["store"]).get(), 1);
    }

    #[test]
    fn test_store_up_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_store_up(true);
        assert_eq!(metrics.store_up.get(), 1);
        metrics.set_store_up(false);
        assert_eq!(metrics.store_up.get(), 0);
    }
}
