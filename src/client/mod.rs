//! Freshdesk REST client

pub mod executor;
pub mod pagination;

pub use executor::{parse_retry_after, ApiResponse, FreshdeskClient, RetryPolicy, USER_AGENT};
pub use pagination::PageCursor;

use crate::budget::{ConversationItem, ConversationPage, ConversationSource};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
impl ConversationSource for FreshdeskClient {
    async fn fetch_page(&self, ticket_id: u64, page: u32, per_page: u32) -> Result<ConversationPage> {
        let response = self
            .get(
                &format!("tickets/{ticket_id}/conversations"),
                &[("page", page.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;

        let cursor = response.cursor();
        let items: Vec<ConversationItem> = if response.body.is_null() {
            Vec::new()
        } else {
            response.into_json()?
        };

        Ok(ConversationPage { items, cursor })
    }
}
