//! MCP tool abstractions and the Freshdesk tool catalogue

use crate::budget::MAX_PER_PAGE;
use crate::client::FreshdeskClient;
use crate::error::{FreshdeskError, Result};
use crate::metrics::METRICS;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod companies;
pub mod conversations;
pub mod diagnostics;
pub mod tickets;

/// Shared state handed to every tool invocation
#[derive(Clone)]
pub struct ToolContext {
    pub client: Arc<FreshdeskClient>,
}

impl ToolContext {
    pub fn new(client: Arc<FreshdeskClient>) -> Self {
        Self { client }
    }
}

/// One callable MCP tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must be unique)
    fn name(&self) -> &'static str;

    /// Tool description
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// JSON schema of the argument object
    fn input_schema(&self) -> Value;

    /// Execute the tool with given input
    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value>;

    /// Validate input before execution (optional)
    fn validate_input(&self, _input: &Value) -> Result<()> {
        Ok(())
    }
}

/// Tool registry, iterated in registration order
pub struct ToolRegistry {
    tools: IndexMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Registry holding every Freshdesk tool
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(conversations::GetTicketConversationTool));
        registry.register(Box::new(conversations::GetAllTicketConversationsTool));
        registry.register(Box::new(tickets::GetTicketsTool));
        registry.register(Box::new(tickets::GetTicketTool));
        registry.register(Box::new(tickets::SearchTicketsTool));
        registry.register(Box::new(tickets::CreateTicketReplyTool));
        registry.register(Box::new(tickets::CreateTicketNoteTool));
        registry.register(Box::new(tickets::ViewTicketSummaryTool));
        registry.register(Box::new(companies::ListCompaniesTool));
        registry.register(Box::new(companies::ViewCompanyTool));
        registry.register(Box::new(diagnostics::GetMetricsTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.values().map(|t| t.as_ref())
    }

    /// Validate and run `name`, recording the outcome
    pub async fn call(&self, name: &str, input: Value, ctx: &ToolContext) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| FreshdeskError::Validation(format!("Unknown tool: {name}")))?;

        debug!("Invoking tool {}", name);
        let result = match tool.validate_input(&input) {
            Ok(()) => tool.invoke(input, ctx).await,
            Err(e) => Err(e),
        };

        METRICS.record_tool_call(name, result.is_ok());
        if let Err(e) = &result {
            warn!("Tool {} failed: {}", name, e);
        }
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize tool arguments; a missing argument object counts as `{}`
pub(crate) fn parse_args<T: DeserializeOwned>(input: Value) -> Result<T> {
    let input = if input.is_null() {
        Value::Object(Default::default())
    } else {
        input
    };
    serde_json::from_value(input)
        .map_err(|e| FreshdeskError::Validation(format!("Invalid arguments: {e}")))
}

pub(crate) fn validate_page(page: u32, per_page: u32) -> Result<()> {
    if page < 1 {
        return Err(FreshdeskError::Validation(
            "Page number must be greater than 0".to_string(),
        ));
    }
    if per_page < 1 || per_page > MAX_PER_PAGE {
        return Err(FreshdeskError::Validation(format!(
            "Page size must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    Ok(())
}

/// GET one page of a plain collection and wrap it with its cursor
pub(crate) async fn list_page(
    ctx: &ToolContext,
    path: &str,
    key: &str,
    page: u32,
    per_page: u32,
) -> Result<Value> {
    validate_page(page, per_page)?;
    let response = ctx
        .client
        .get(path, &[("page", page.to_string()), ("per_page", per_page.to_string())])
        .await?;
    let cursor = response.cursor();

    Ok(serde_json::json!({
        key: response.body,
        "pagination": {
            "current_page": page,
            "next_page": cursor.next,
            "prev_page": cursor.prev,
            "per_page": per_page,
        }
    }))
}

pub(crate) fn default_page() -> u32 {
    1
}

pub(crate) fn default_list_page_size() -> u32 {
    30
}
