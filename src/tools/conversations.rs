//! Budgeted conversation tools

use super::{default_page, parse_args, Tool, ToolContext};
use crate::budget::{BudgetedRequest, ConversationAggregator, MAX_BUDGET_UNITS};
use crate::error::Result;
use crate::markup::TransformOptions;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

fn default_conversation_page_size() -> u32 {
    10
}

fn default_budget() -> usize {
    MAX_BUDGET_UNITS
}

/// Transform switches shared by both conversation tools
fn filter_properties() -> Value {
    json!({
        "filter_encrypted_reports": {
            "type": "boolean",
            "default": true,
            "description": "Replace -----BEGIN REPORT----- blocks with a placeholder"
        },
        "report_placeholder": {
            "type": "string",
            "default": crate::markup::DEFAULT_PLACEHOLDER
        },
        "include_html_body": {
            "type": "boolean",
            "default": false,
            "description": "Keep the raw HTML body (costly)"
        },
        "extract_links": {
            "type": "boolean",
            "default": true,
            "description": "Attach anchors found in the HTML body as `links`"
        },
        "resume_after_id": {
            "type": "integer",
            "description": "Skip items of the first page up to and including this conversation id"
        }
    })
}

fn with_filter_properties(mut properties: Value) -> Value {
    if let (Some(target), Value::Object(extra)) = (properties.as_object_mut(), filter_properties()) {
        target.extend(extra);
    }
    properties
}

#[derive(Debug, Deserialize)]
struct ConversationPageArgs {
    ticket_id: u64,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_conversation_page_size")]
    per_page: u32,
    #[serde(default = "default_budget")]
    max_tokens: usize,
    #[serde(default)]
    resume_after_id: Option<i64>,
    #[serde(flatten)]
    filter: TransformOptions,
}

impl ConversationPageArgs {
    fn into_request(self) -> BudgetedRequest {
        BudgetedRequest {
            ticket_id: self.ticket_id,
            start_page: self.page,
            per_page: self.per_page,
            max_units: self.max_tokens,
            filter: self.filter,
            resume_after_id: self.resume_after_id,
        }
    }
}

/// One page of a ticket's conversations, cut to the budget
pub struct GetTicketConversationTool;

#[async_trait]
impl Tool for GetTicketConversationTool {
    fn name(&self) -> &'static str {
        "get_ticket_conversation"
    }

    fn description(&self) -> &'static str {
        "Get one page of ticket conversations, truncated to stay under a token limit"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": with_filter_properties(json!({
                "ticket_id": {"type": "integer", "minimum": 1},
                "page": {"type": "integer", "minimum": 1, "default": 1},
                "per_page": {"type": "integer", "minimum": 1, "maximum": 100, "default": 10},
                "max_tokens": {"type": "integer", "minimum": 1, "maximum": MAX_BUDGET_UNITS, "default": MAX_BUDGET_UNITS}
            })),
            "required": ["ticket_id"]
        })
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        parse_args::<ConversationPageArgs>(input.clone())?
            .into_request()
            .validate()
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let request = parse_args::<ConversationPageArgs>(input)?.into_request();
        let page = ConversationAggregator::new(ctx.client.as_ref())
            .page_budgeted(&request)
            .await?;
        Ok(serde_json::to_value(page)?)
    }
}

#[derive(Debug, Deserialize)]
struct AllConversationsArgs {
    ticket_id: u64,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_conversation_page_size")]
    per_page: u32,
    #[serde(default = "default_budget")]
    max_total_tokens: usize,
    #[serde(default)]
    resume_after_id: Option<i64>,
    #[serde(flatten)]
    filter: TransformOptions,
}

impl AllConversationsArgs {
    fn into_request(self) -> BudgetedRequest {
        BudgetedRequest {
            ticket_id: self.ticket_id,
            start_page: self.page,
            per_page: self.per_page,
            max_units: self.max_total_tokens,
            filter: self.filter,
            resume_after_id: self.resume_after_id,
        }
    }
}

/// Walks every conversation page until the budget is spent.
///
/// To continue a partial result, call again with `page = resume.next_page`,
/// `resume_after_id = resume.last_item_id` and the same `per_page`.
pub struct GetAllTicketConversationsTool;

#[async_trait]
impl Tool for GetAllTicketConversationsTool {
    fn name(&self) -> &'static str {
        "get_all_ticket_conversations"
    }

    fn description(&self) -> &'static str {
        "Get ticket conversations across pages under a total token budget; \
         resume with resume.next_page and resume.last_item_id"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": with_filter_properties(json!({
                "ticket_id": {"type": "integer", "minimum": 1},
                "page": {"type": "integer", "minimum": 1, "default": 1, "description": "Page to start or resume from"},
                "per_page": {"type": "integer", "minimum": 1, "maximum": 100, "default": 10, "description": "Keep constant across resumed calls"},
                "max_total_tokens": {"type": "integer", "minimum": 1, "maximum": MAX_BUDGET_UNITS, "default": MAX_BUDGET_UNITS}
            })),
            "required": ["ticket_id"]
        })
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        parse_args::<AllConversationsArgs>(input.clone())?
            .into_request()
            .validate()
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let request = parse_args::<AllConversationsArgs>(input)?.into_request();
        let result = ConversationAggregator::new(ctx.client.as_ref())
            .list_budgeted(&request)
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}
