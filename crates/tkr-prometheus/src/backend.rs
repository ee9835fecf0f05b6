use std::sync::Arc;

use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use tkr_core::metrics::{MetricsBackend, RunOutcome};

const NAMESPACE: &str = "tkr";

/// Run durations range from seconds to the default one-hour timeout and beyond.
const DURATION_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0];

/// Prometheus metrics backend for the reconciler.
///
/// ## Label cardinality
/// - `outcome`: "success", "failure", "cancelled", "timeout"
/// - `error_kind`: see [`tkr_core::error::ReconcileError::kind`]
#[derive(Clone)]
pub struct PrometheusMetrics {
    pods_created: Counter,
    runs_completed: CounterVec,
    run_duration: HistogramVec,
    retries: Counter,
    reconcile_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Register all collectors in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let pods_created = Counter::with_opts(
            Opts::new("pods_created_total", "Total number of pods submitted for runs")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(pods_created.clone()))?;

        let runs_completed = CounterVec::new(
            Opts::new("runs_completed_total", "Total number of runs reaching a terminal condition")
                .namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(runs_completed.clone()))?;

        let run_duration = HistogramVec::new(
            HistogramOpts::new("run_duration_seconds", "Run duration from start to completion")
                .namespace(NAMESPACE)
                .buckets(DURATION_BUCKETS.to_vec()),
            &["outcome"],
        )?;
        registry.register(Box::new(run_duration.clone()))?;

        let retries = Counter::with_opts(
            Opts::new("run_retries_total", "Total number of failed attempts archived for retry")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(retries.clone()))?;

        let reconcile_errors = CounterVec::new(
            Opts::new("reconcile_errors_total", "Total transient reconcile failures")
                .namespace(NAMESPACE),
            &["error_kind"],
        )?;
        registry.register(Box::new(reconcile_errors.clone()))?;

        Ok(Self {
            pods_created,
            runs_completed,
            run_duration,
            retries,
            reconcile_errors,
            registry,
        })
    }

    /// Backend with a private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format, as served on `/metrics`.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_pod_created(&self) {
        self.pods_created.inc();
    }

    fn record_run_completed(&self, outcome: RunOutcome, duration_ms: u64) {
        let label = outcome.as_label();
        self.runs_completed.with_label_values(&[label]).inc();
        self.run_duration
            .with_label_values(&[label])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_retry(&self) {
        self.retries.inc();
    }

    fn record_reconcile_error(&self, error_kind: &str) {
        self.reconcile_errors.with_label_values(&[error_kind]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn counts_pods_and_retries() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_pod_created();
        metrics.record_pod_created();
        metrics.record_retry();

        let families = metrics.gather();
        let pods = family(&families, "tkr_pods_created_total");
        assert_eq!(pods.get_metric()[0].get_counter().value(), 2.0);
        let retries = family(&families, "tkr_run_retries_total");
        assert_eq!(retries.get_metric()[0].get_counter().value(), 1.0);
    }

    #[test]
    fn completion_feeds_counter_and_histogram_per_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_run_completed(RunOutcome::Success, 1_500);
        metrics.record_run_completed(RunOutcome::Timeout, 3_600_000);
        metrics.record_run_completed(RunOutcome::Success, 500);

        let families = metrics.gather();
        assert_eq!(family(&families, "tkr_runs_completed_total").get_metric().len(), 2);

        let duration = family(&families, "tkr_run_duration_seconds");
        let total: u64 = duration
            .get_metric()
            .iter()
            .map(|m| m.get_histogram().get_sample_count())
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn errors_are_labelled_by_kind() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_reconcile_error("unavailable");
        metrics.record_reconcile_error("build");
        metrics.record_reconcile_error("unavailable");

        let families = metrics.gather();
        assert_eq!(family(&families, "tkr_reconcile_errors_total").get_metric().len(), 2);
    }

    #[test]
    fn text_encoding_contains_registered_names() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_run_completed(RunOutcome::Cancelled, 10);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("tkr_runs_completed_total{outcome=\"cancelled\"} 1"));
        assert!(text.contains("# TYPE tkr_run_duration_seconds histogram"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = Arc::new(Registry::new());
        let _first = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
