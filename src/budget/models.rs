//! Data models for budgeted conversation retrieval

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys that may hold free text worth transforming
pub const TEXT_FIELDS: [&str; 3] = ["body", "body_text", "description"];

/// One conversation entry as returned by the API.
///
/// The entry is kept as an ordered map so every key and value, `null`
/// included, passes through as received. Transforms only rewrite text fields
/// that actually hold strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationItem {
    fields: IndexMap<String, Value>,
}

impl ConversationItem {
    /// Numeric `id`, when present
    pub fn id(&self) -> Option<i64> {
        self.fields.get("id").and_then(Value::as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String value of `key`; `None` when absent or not a string
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Set `key`, keeping its position when it already exists
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.fields.insert(key.to_string(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Continuation state handed back to the caller.
///
/// `has_more == false` implies `next_page == None`, and `budget_exhausted`
/// implies `has_more`. The constructors are the only way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResumeToken {
    has_more: bool,
    budget_exhausted: bool,
    next_page: Option<u32>,
    last_item_id: Option<i64>,
}

impl ResumeToken {
    /// Every page was drained
    pub fn complete(last_item_id: Option<i64>) -> Self {
        Self {
            has_more: false,
            budget_exhausted: false,
            next_page: None,
            last_item_id,
        }
    }

    /// Budget tripped part way through `page`; the page must be fetched again
    pub fn exhausted(page: u32, last_item_id: Option<i64>) -> Self {
        Self {
            has_more: true,
            budget_exhausted: true,
            next_page: Some(page),
            last_item_id,
        }
    }

    /// Budget filled exactly at a page boundary; continue at `next_page`
    pub fn more(next_page: u32, last_item_id: Option<i64>) -> Self {
        Self {
            has_more: true,
            budget_exhausted: false,
            next_page: Some(next_page),
            last_item_id,
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn budget_exhausted(&self) -> bool {
        self.budget_exhausted
    }

    pub fn next_page(&self) -> Option<u32> {
        self.next_page
    }

    pub fn last_item_id(&self) -> Option<i64> {
        self.last_item_id
    }
}

/// Counters for report redaction, reported alongside results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteringReport {
    pub encrypted_reports_removed: bool,
    pub reports_found: usize,
    pub tokens_saved: usize,
}

/// Totals for one aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub total_conversations: usize,
    pub total_pages_fetched: u32,
    pub total_token_count: usize,
    pub max_tokens: usize,
    pub complete: bool,
}

/// Result of a multi-page budgeted listing
#[derive(Debug, Clone, Serialize)]
pub struct BudgetedConversations {
    pub conversations: Vec<ConversationItem>,
    pub summary: AggregationSummary,
    pub resume: ResumeToken,
    pub filtering: FilteringReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Pagination block of a single-page fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePagination {
    pub current_page: u32,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
    pub per_page: u32,
    pub items_returned: usize,
    pub has_more: bool,
    pub token_count: usize,
    pub truncated: bool,
    pub last_item_id: Option<i64>,
}

/// Result of a single-page budgeted fetch
#[derive(Debug, Clone, Serialize)]
pub struct BudgetedPage {
    pub conversations: Vec<ConversationItem>,
    pub pagination: PagePagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtering: Option<FilteringReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
