//! Company tools

use super::{
    default_list_page_size, default_page, list_page, parse_args, validate_page, Tool, ToolContext,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ListCompaniesArgs {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_list_page_size")]
    per_page: u32,
}

pub struct ListCompaniesTool;

#[async_trait]
impl Tool for ListCompaniesTool {
    fn name(&self) -> &'static str {
        "list_companies"
    }

    fn description(&self) -> &'static str {
        "List companies with pagination"
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
        let args: ListCompaniesArgs = parse_args(input.clone())?;
        validate_page(args.page, args.per_page)
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: ListCompaniesArgs = parse_args(input)?;
        list_page(ctx, "companies", "companies", args.page, args.per_page).await
    }
}

#[derive(Debug, Deserialize)]
struct CompanyIdArgs {
    company_id: u64,
}

pub struct ViewCompanyTool;

#[async_trait]
impl Tool for ViewCompanyTool {
    fn name(&self) -> &'static str {
        "view_company"
    }

    fn description(&self) -> &'static str {
        "Get a single company"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"company_id": {"type": "integer", "minimum": 1}},
            "required": ["company_id"]
        })
    }

    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let args: CompanyIdArgs = parse_args(input)?;
        Ok(ctx
            .client
            .get(&format!("companies/{}", args.company_id), &[])
            .await?
            .body)
    }
}
