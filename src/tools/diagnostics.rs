//! Server diagnostics

use super::{Tool, ToolContext};
use crate::error::Result;
use crate::metrics::METRICS;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Current request, retry, budget and tool-call counters in Prometheus text format
pub struct GetMetricsTool;

#[async_trait]
impl Tool for GetMetricsTool {
    fn name(&self) -> &'static str {
        "get_metrics"
    }

    fn description(&self) -> &'static str {
        "Report server metrics (API requests, retries, budget usage, tool calls) in Prometheus text format"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _input: Value, _ctx: &ToolContext) -> Result<Value> {
        Ok(json!({
            "format": "prometheus",
            "metrics": METRICS.export_prometheus(),
        }))
    }
}
