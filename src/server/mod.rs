//! MCP request dispatch

pub mod protocol;
pub mod stdio;

use crate::tools::{ToolContext, ToolRegistry};
use protocol::{
    JsonRpcRequest, JsonRpcResponse, McpToolDefinition, ToolCallParams, ToolCallResult,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use serde_json::{json, Value};
use tracing::{debug, info};

pub use stdio::serve;

/// Server name reported by `initialize`
pub const SERVER_NAME: &str = "freshdesk-mcp";

/// Dispatches JSON-RPC requests to the tool registry
pub struct McpServer {
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, ctx: ToolContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw line; `None` when nothing should be written back
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match Self::parse_line(line) {
            Ok(value) => self.handle_value(value).await,
            Err(response) => Some(response),
        }
    }

    /// Decode a line as JSON; malformed input yields the parse-error response
    pub fn parse_line(line: &str) -> std::result::Result<Value, JsonRpcResponse> {
        serde_json::from_str(line).map_err(|e| {
            JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
        })
    }

    /// Handle an already decoded message
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => id.map(|id| {
                JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid request: {e}"))
            }),
        }
    }

    /// Handle a parsed request. Notifications never get a response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            debug!("Notification {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.tool_definitions() })),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        info!("Client initialized, {} tools available", self.registry.list().len());
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
        })
    }

    pub fn tool_definitions(&self) -> Vec<McpToolDefinition> {
        self.registry
            .iter()
            .map(|tool| McpToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = match params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}"))
            }
            None => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        if self.registry.get(&params.name).is_none() {
            return JsonRpcResponse::failure(
                id,
                INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            );
        }

        let outcome = self
            .registry
            .call(&params.name, params.arguments, &self.ctx)
            .await;
        let result = ToolCallResult::from_outcome(outcome);

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}
