//! Ticket tools

use super::{
    default_list_page_size, default_page, list_page, parse_args, validate_page, Tool, ToolContext,
};
use crate::error::{FreshdeskError, Result};
use crate::markup::strip_tags;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct TicketIdArgs {
    ticket_id: u64,
}

fn ticket_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"ticket_id": {"type": "integer", "minimum": 1}},
        "required": ["ticket_id"]
    })
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_list_page_size")]
    per_page: u32,
}

pub struct GetTicketsTool;

#[async_trait]
impl Tool for GetTicketsTool {
    fn name(&self) -> &'static str {
        "get_tickets"
    }

    fn description(&self) -> &'static str {
        "List tickets with pagination"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "page": {"type": "integer", "minimum": 1, "default": 1},
                "per_page": {"type": "integer", "minimum": 1, "maximum": 100, "default": 30}
            }
        })
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        let args: ListArgs = parse_args(input.clone())?;
        validate_page(args.page, args.per_page)
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: ListArgs = parse_args(input)?;
        list_page(ctx, "tickets", "tickets", args.page, args.per_page).await
    }
}

pub struct GetTicketTool;

#[async_trait]
impl Tool for GetTicketTool {
    fn name(&self) -> &'static str {
        "get_ticket"
    }

    fn description(&self) -> &'static str {
        "Get a single ticket"
    }

    fn input_schema(&self) -> Value {
        ticket_id_schema()
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: TicketIdArgs = parse_args(input)?;
        Ok(ctx.client.get(&format!("tickets/{}", args.ticket_id), &[]).await?.body)
    }
}

pub struct ViewTicketSummaryTool;

#[async_trait]
impl Tool for ViewTicketSummaryTool {
    fn name(&self) -> &'static str {
        "view_ticket_summary"
    }

    fn description(&self) -> &'static str {
        "Get the summary of a ticket"
    }

    fn input_schema(&self) -> Value {
        ticket_id_schema()
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: TicketIdArgs = parse_args(input)?;
        Ok(ctx
            .client
            .get(&format!("tickets/{}/summary", args.ticket_id), &[])
            .await?
            .body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    quantity: Option<usize>,
}

/// Ticket search; `description` fields come back as plain text
pub struct SearchTicketsTool;

impl SearchTicketsTool {
    fn clean(mut body: Value, quantity: Option<usize>) -> Value {
        let Some(results) = body.get_mut("results").and_then(Value::as_array_mut) else {
            return body;
        };
        if let Some(limit) = quantity {
            results.truncate(limit);
        }
        for result in results.iter_mut() {
            if let Some(Value::String(description)) = result.get_mut("description") {
                *description = strip_tags(description);
            }
        }
        body
    }
}

#[async_trait]
impl Tool for SearchTicketsTool {
    fn name(&self) -> &'static str {
        "search_tickets"
    }

    fn description(&self) -> &'static str {
        "Search tickets with a Freshdesk query string, e.g. \"priority:3 AND status:2\""
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "quantity": {"type": "integer", "minimum": 1, "description": "Return at most this many results"}
            },
            "required": ["query"]
        })
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        let args: SearchArgs = parse_args(input.clone())?;
        if args.query.trim().is_empty() {
            return Err(FreshdeskError::Validation("query must not be empty".to_string()));
        }
        if args.quantity == Some(0) {
            return Err(FreshdeskError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: SearchArgs = parse_args(input)?;
        let response = ctx
            .client
            .get("search/tickets", &[("query", args.query)])
            .await?;
        Ok(Self::clean(response.body, args.quantity))
    }
}

#[derive(Debug, Deserialize)]
struct BodyArgs {
    ticket_id: u64,
    body: String,
}

fn body_schema(body_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticket_id": {"type": "integer", "minimum": 1},
            "body": {"type": "string", "description": body_description}
        },
        "required": ["ticket_id", "body"]
    })
}

fn validate_body(input: &Value) -> Result<()> {
    let args: BodyArgs = parse_args(input.clone())?;
    if args.body.trim().is_empty() {
        return Err(FreshdeskError::Validation("body must not be empty".to_string()));
    }
    Ok(())
}

pub struct CreateTicketReplyTool;

#[async_trait]
impl Tool for CreateTicketReplyTool {
    fn name(&self) -> &'static str {
        "create_ticket_reply"
    }

    fn description(&self) -> &'static str {
        "Reply to a ticket"
    }

    fn input_schema(&self) -> Value {
        body_schema("HTML content of the reply")
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        validate_body(input)
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: BodyArgs = parse_args(input)?;
        let path = format!("tickets/{}/reply", args.ticket_id);
        Ok(ctx.client.post(&path, &json!({"body": args.body})).await?.body)
    }
}

pub struct CreateTicketNoteTool;

#[async_trait]
impl Tool for CreateTicketNoteTool {
    fn name(&self) -> &'static str {
        "create_ticket_note"
    }

    fn description(&self) -> &'static str {
        "Add a note to a ticket"
    }

    fn input_schema(&self) -> Value {
        body_schema("HTML content of the note")
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        validate_body(input)
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: BodyArgs = parse_args(input)?;
        let path = format!("tickets/{}/notes", args.ticket_id);
        Ok(ctx.client.post(&path, &json!({"body": args.body})).await?.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_for;
    use mockito::Matcher;

    #[test]
    fn test_search_results_are_limited_and_stripped() {
        let body = json!({
            "results": [
                {"id": 1, "description": "<p>Printer <b>jammed</b></p><p>again</p>"},
                {"id": 2, "description": "plain"},
                {"id": 3, "description": "dropped"}
            ],
            "total": 3
        });
        let cleaned = SearchTicketsTool::clean(body, Some(2));

        let results = cleaned["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["description"], "Printer jammed\n\nagain");
        assert_eq!(results[1]["description"], "plain");
        assert_eq!(cleaned["total"], 3);
    }

    #[test]
    fn test_search_without_results_key_passes_through() {
        let body = json!({"errors": []});
        assert_eq!(SearchTicketsTool::clean(body.clone(), Some(1)), body);
    }

    #[test]
    fn test_search_rejects_zero_quantity() {
        assert!(SearchTicketsTool
            .validate_input(&json!({"query": "status:2", "quantity": 0}))
            .is_err());
    }

    #[test]
    fn test_reply_requires_body() {
        assert!(CreateTicketReplyTool
            .validate_input(&json!({"ticket_id": 1, "body": "  "}))
            .is_err());
        assert!(CreateTicketNoteTool
            .validate_input(&json!({"ticket_id": 1, "body": "noted"}))
            .is_ok());
    }

    #[tokio::test]
    async fn test_get_tickets_wraps_pagination() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tickets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "30".into()),
            ]))
            .with_status(200)
            .with_header("link", r#"<https://acme.freshdesk.com/api/v2/tickets?page=2>; rel="next""#)
            .with_body(r#"[{"id": 1}, {"id": 2}]"#)
            .create_async()
            .await;

        let out = GetTicketsTool
            .invoke(json!({}), &context_for(&server))
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(out["tickets"].as_array().unwrap().len(), 2);
        assert_eq!(out["pagination"]["next_page"], 2);
        assert_eq!(out["pagination"]["prev_page"], Value::Null);
        assert_eq!(out["pagination"]["per_page"], 30);
    }

    #[tokio::test]
    async fn test_note_posts_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tickets/9/notes")
            .match_body(Matcher::Json(json!({"body": "internal"})))
            .with_status(201)
            .with_body(r#"{"id": 100, "body": "internal"}"#)
            .create_async()
            .await;

        let out = CreateTicketNoteTool
            .invoke(json!({"ticket_id": 9, "body": "internal"}), &context_for(&server))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out["id"], 100);
    }

    #[tokio::test]
    async fn test_missing_ticket_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/tickets/404")
            .with_status(404)
            .with_body(r#"{"code": "access_denied"}"#)
            .create_async()
            .await;

        let err = GetTicketTool
            .invoke(json!({"ticket_id": 404}), &context_for(&server))
            .await
            .unwrap_err();
        let payload = err.to_payload();
        assert_eq!(payload["error"]["status"], 404);
        assert_eq!(payload["error"]["payload"]["code"], "access_denied");
    }
}
