//! Metrics collection for observability

use prometheus::{
    Counter, CounterVec, Histogram, HistogramVec, Opts, Registry,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_counter_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Upstream API metrics
    pub api_requests: CounterVec,
    pub api_retries: CounterVec,
    pub api_request_duration: HistogramVec,

    // Budget metrics
    pub budget_units_consumed: Histogram,
    pub budget_exhausted: Counter,
    pub reports_redacted: Counter,

    // Tool metrics
    pub tool_calls: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let api_requests = register_counter_vec_with_registry!(
            Opts::new("freshdesk_requests_total", "Total Freshdesk API requests"),
            &["method", "status"],
            registry
        )?;

        let api_retries = register_counter_vec_with_registry!(
            Opts::new("freshdesk_retries_total", "Total retried Freshdesk API attempts"),
            &["reason"],
            registry
        )?;

        let api_request_duration = register_histogram_vec_with_registry!(
            "freshdesk_request_duration_seconds",
            "Freshdesk API request duration in seconds, retries included",
            &["method"],
            registry
        )?;

        let budget_units_consumed = register_histogram_with_registry!(
            "budget_units_consumed",
            "Budget units consumed per conversation listing",
            registry
        )?;

        let budget_exhausted = register_counter_with_registry!(
            Opts::new("budget_exhausted_total", "Listings stopped by the size budget"),
            registry
        )?;

        let reports_redacted = register_counter_with_registry!(
            Opts::new("reports_redacted_total", "Report blocks replaced by a placeholder"),
            registry
        )?;

        let tool_calls = register_counter_vec_with_registry!(
            Opts::new("tool_calls_total", "Total MCP tool invocations"),
            &["tool", "status"],
            registry
        )?;

        Ok(Self {
            registry,
            api_requests,
            api_retries,
            api_request_duration,
            budget_units_consumed,
            budget_exhausted,
            reports_redacted,
            tool_calls,
        })
    }

    /// Record one HTTP attempt outcome
    pub fn record_request(&self, method: &str, status: &str) {
        self.api_requests.with_label_values(&[method, status]).inc();
    }

    /// Record a retry and its cause (`rate_limited`, `server_error`, `network`)
    pub fn record_retry(&self, reason: &str) {
        self.api_retries.with_label_values(&[reason]).inc();
    }

    /// Record the outcome of one budgeted listing
    pub fn record_budget(&self, consumed: usize, exhausted: bool, reports: usize) {
        self.budget_units_consumed.observe(consumed as f64);
        if exhausted {
            self.budget_exhausted.inc();
        }
        self.reports_redacted.inc_by(reports as f64);
    }

    /// Record a tool call
    pub fn record_tool_call(&self, tool: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.tool_calls.with_label_values(&[tool, status]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
