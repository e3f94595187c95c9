//! Budgeted, resumable retrieval of ticket conversations
//!
//! Pages are fetched strictly in order. Each item is transformed, estimated
//! and either appended or, when it would overflow the budget, left for the
//! next call. A budget stop mid-page hands back the *current* page as the
//! resume point together with the id of the last item returned; the caller
//! re-fetches that page and skips past that id. This assumes the server keeps
//! ordering stable and does not mutate already-seen items between calls.
//!
//! `per_page` must stay the same across a resumed scan, otherwise page
//! boundaries shift and items are skipped or repeated. This is not enforced.

use super::estimator::{CharRatioEstimator, TokenEstimator};
use super::models::{
    AggregationSummary, BudgetedConversations, BudgetedPage, ConversationItem, FilteringReport,
    PagePagination, ResumeToken,
};
use crate::client::pagination::PageCursor;
use crate::error::{FreshdeskError, Result};
use crate::markup::{transform_item, TransformOptions};
use crate::metrics::METRICS;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Hard ceiling for any caller-supplied budget
pub const MAX_BUDGET_UNITS: usize = 20_000;

/// Largest page size the API accepts
pub const MAX_PER_PAGE: u32 = 100;

/// One page of raw conversation items
#[derive(Debug, Clone, Default)]
pub struct ConversationPage {
    pub items: Vec<ConversationItem>,
    pub cursor: PageCursor,
}

/// Where conversation pages come from
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn fetch_page(&self, ticket_id: u64, page: u32, per_page: u32)
        -> Result<ConversationPage>;
}

/// Parameters of one budgeted retrieval
#[derive(Debug, Clone)]
pub struct BudgetedRequest {
    pub ticket_id: u64,
    pub start_page: u32,
    pub per_page: u32,
    pub max_units: usize,
    pub filter: TransformOptions,
    /// Skip the start page's items up to and including this id
    pub resume_after_id: Option<i64>,
}

impl BudgetedRequest {
    pub fn new(ticket_id: u64) -> Self {
        Self {
            ticket_id,
            start_page: 1,
            per_page: 10,
            max_units: MAX_BUDGET_UNITS,
            filter: TransformOptions::default(),
            resume_after_id: None,
        }
    }

    /// Bounds check, done before any network call
    pub fn validate(&self) -> Result<()> {
        if self.start_page < 1 {
            return Err(FreshdeskError::Validation(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if self.per_page < 1 || self.per_page > MAX_PER_PAGE {
            return Err(FreshdeskError::Validation(format!(
                "Page size must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        if self.max_units < 1 || self.max_units > MAX_BUDGET_UNITS {
            return Err(FreshdeskError::Validation(format!(
                "Maximum tokens must be between 1 and {MAX_BUDGET_UNITS}"
            )));
        }
        Ok(())
    }
}

/// Accumulated state of one call; dropped on error
#[derive(Debug)]
struct BudgetState {
    items: Vec<ConversationItem>,
    consumed: usize,
    reports_redacted: usize,
    units_saved: usize,
    last_item_id: Option<i64>,
    current_page: u32,
    pages_fetched: u32,
}

impl BudgetState {
    fn new(start_page: u32) -> Self {
        Self {
            items: Vec::new(),
            consumed: 0,
            reports_redacted: 0,
            units_saved: 0,
            last_item_id: None,
            current_page: start_page,
            pages_fetched: 0,
        }
    }

    fn filtering(&self, filter: &TransformOptions) -> FilteringReport {
        FilteringReport {
            encrypted_reports_removed: filter.filter_encrypted_reports,
            reports_found: self.reports_redacted,
            tokens_saved: self.units_saved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    Complete,
    Exhausted,
}

/// Drop items up to and including `after_id`; keep everything if it is absent
fn skip_through(items: &mut Vec<ConversationItem>, after_id: i64) {
    if let Some(pos) = items.iter().position(|item| item.id() == Some(after_id)) {
        items.drain(..=pos);
    }
}

fn oversized_item_warning(max_units: usize) -> String {
    format!(
        "The next conversation alone exceeds the budget of {max_units} tokens; \
         retry with a larger max_tokens or include_html_body=false"
    )
}

/// Budget-enforcing aggregator over a [`ConversationSource`]
pub struct ConversationAggregator<'a, S: ?Sized, E = CharRatioEstimator> {
    source: &'a S,
    estimator: E,
}

impl<'a, S: ConversationSource + ?Sized> ConversationAggregator<'a, S, CharRatioEstimator> {
    pub fn new(source: &'a S) -> Self {
        Self::with_estimator(source, CharRatioEstimator::default())
    }
}

impl<'a, S: ConversationSource + ?Sized, E: TokenEstimator> ConversationAggregator<'a, S, E> {
    pub fn with_estimator(source: &'a S, estimator: E) -> Self {
        Self { source, estimator }
    }

    /// Walk pages from `start_page` until the data or the budget runs out
    pub async fn list_budgeted(&self, request: &BudgetedRequest) -> Result<BudgetedConversations> {
        request.validate()?;

        let mut state = BudgetState::new(request.start_page);
        let mut skip = request.resume_after_id;
        let mut warnings = Vec::new();

        let resume = loop {
            let page = state.current_page;
            let ConversationPage { mut items, cursor } = self
                .source
                .fetch_page(request.ticket_id, page, request.per_page)
                .await?;
            state.pages_fetched += 1;

            if let Some(after_id) = skip.take() {
                skip_through(&mut items, after_id);
            }

            debug!(
                "Ticket {} page {}: {} items, {} of {} tokens used",
                request.ticket_id,
                page,
                items.len(),
                state.consumed,
                request.max_units
            );

            if self.drain_page(&mut state, items, request)? == Drain::Exhausted {
                break ResumeToken::exhausted(page, state.last_item_id);
            }

            match cursor.next {
                None => break ResumeToken::complete(state.last_item_id),
                Some(next) if next <= page => {
                    warn!(
                        "Ticket {}: next page {} does not follow page {}, stopping",
                        request.ticket_id, next, page
                    );
                    warnings.push(format!(
                        "Pagination stopped at page {page}: the server pointed back to page {next}"
                    ));
                    break ResumeToken::complete(state.last_item_id);
                }
                Some(next) if state.consumed >= request.max_units => {
                    break ResumeToken::more(next, state.last_item_id)
                }
                Some(next) => state.current_page = next,
            }
        };

        if resume.budget_exhausted() && state.items.is_empty() {
            warnings.push(oversized_item_warning(request.max_units));
        }

        METRICS.record_budget(state.consumed, resume.budget_exhausted(), state.reports_redacted);
        info!(
            "Ticket {}: {} conversations from {} pages, {} tokens, more={}",
            request.ticket_id,
            state.items.len(),
            state.pages_fetched,
            state.consumed,
            resume.has_more()
        );

        Ok(BudgetedConversations {
            summary: AggregationSummary {
                total_conversations: state.items.len(),
                total_pages_fetched: state.pages_fetched,
                total_token_count: state.consumed,
                max_tokens: request.max_units,
                complete: !resume.has_more(),
            },
            filtering: state.filtering(&request.filter),
            conversations: state.items,
            resume,
            warnings,
        })
    }

    /// Fetch exactly `start_page` and fill it up to the budget
    pub async fn page_budgeted(&self, request: &BudgetedRequest) -> Result<BudgetedPage> {
        request.validate()?;

        let page = request.start_page;
        let ConversationPage { mut items, cursor } = self
            .source
            .fetch_page(request.ticket_id, page, request.per_page)
            .await?;
        if let Some(after_id) = request.resume_after_id {
            skip_through(&mut items, after_id);
        }

        let mut state = BudgetState::new(page);
        state.pages_fetched = 1;
        let truncated = self.drain_page(&mut state, items, request)? == Drain::Exhausted;

        let mut warnings = Vec::new();
        if truncated {
            warnings.push(format!(
                "Response truncated to stay under {} token limit. Use smaller per_page value or increase max_tokens.",
                request.max_units
            ));
            if state.items.is_empty() {
                warnings.push(oversized_item_warning(request.max_units));
            }
        }

        METRICS.record_budget(state.consumed, truncated, state.reports_redacted);

        let filtering = request
            .filter
            .filter_encrypted_reports
            .then(|| state.filtering(&request.filter));

        Ok(BudgetedPage {
            pagination: PagePagination {
                current_page: page,
                next_page: cursor.next,
                prev_page: cursor.prev,
                per_page: request.per_page,
                items_returned: state.items.len(),
                has_more: cursor.next.is_some() || truncated,
                token_count: state.consumed,
                truncated,
                last_item_id: state.last_item_id,
            },
            conversations: state.items,
            filtering,
            warnings,
        })
    }

    fn drain_page(
        &self,
        state: &mut BudgetState,
        items: Vec<ConversationItem>,
        request: &BudgetedRequest,
    ) -> Result<Drain> {
        for raw in items {
            let transformed = transform_item(&raw, &request.filter, &self.estimator);
            let cost = self.estimator.estimate_json(&transformed.item)?;

            if state.consumed + cost > request.max_units {
                return Ok(Drain::Exhausted);
            }

            state.consumed += cost;
            state.reports_redacted += transformed.reports_redacted;
            state.units_saved += transformed.units_saved;
            if let Some(id) = raw.id() {
                state.last_item_id = Some(id);
            }
            state.items.push(transformed.item);
        }
        Ok(Drain::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory source: `pages[i]` is page `i + 1`
    struct StaticSource {
        pages: Vec<Vec<ConversationItem>>,
        requested: Mutex<Vec<u32>>,
    }

    impl StaticSource {
        fn new(pages: Vec<Vec<ConversationItem>>) -> Self {
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConversationSource for StaticSource {
        async fn fetch_page(&self, _ticket_id: u64, page: u32, _per_page: u32) -> Result<ConversationPage> {
            self.requested.lock().unwrap().push(page);
            let index = page as usize - 1;
            let total = self.pages.len() as u32;
            Ok(ConversationPage {
                items: self.pages.get(index).cloned().unwrap_or_default(),
                cursor: PageCursor {
                    next: (page < total).then_some(page + 1),
                    prev: (page > 1).then_some(page - 1),
                },
            })
        }
    }

    fn item(id: i64, text: &str) -> ConversationItem {
        serde_json::from_value(json!({"id": id, "body_text": text})).unwrap()
    }

    #[test]
    fn test_validation_bounds() {
        let mut request = BudgetedRequest::new(1);
        assert!(request.validate().is_ok());

        request.max_units = MAX_BUDGET_UNITS + 1;
        assert!(matches!(request.validate(), Err(FreshdeskError::Validation(_))));

        request.max_units = 100;
        request.per_page = 0;
        assert!(request.validate().is_err());
        request.per_page = 101;
        assert!(request.validate().is_err());

        request.per_page = 10;
        request.start_page = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_invalid_budget_never_fetches() {
        let source = StaticSource::new(vec![vec![item(1, "a")]]);
        let aggregator = ConversationAggregator::new(&source);
        let request = BudgetedRequest {
            max_units: 20_001,
            ..BudgetedRequest::new(1)
        };

        assert!(tokio_test::block_on(aggregator.list_budgeted(&request)).is_err());
        assert!(tokio_test::block_on(aggregator.page_budgeted(&request)).is_err());
        assert!(source.requested.lock().unwrap().is_empty());
    }

    struct LoopingSource {
        fetches: Mutex<u32>,
    }

    #[async_trait]
    impl ConversationSource for LoopingSource {
        async fn fetch_page(&self, _ticket_id: u64, page: u32, _per_page: u32) -> Result<ConversationPage> {
            *self.fetches.lock().unwrap() += 1;
            Ok(ConversationPage {
                items: if page == 1 { vec![item(1, "first")] } else { Vec::new() },
                cursor: PageCursor {
                    next: Some(if page == 1 { 2 } else { 1 }),
                    prev: None,
                },
            })
        }
    }

    #[tokio::test]
    async fn test_cursor_that_does_not_advance_ends_the_walk() {
        let source = LoopingSource {
            fetches: Mutex::new(0),
        };
        let result = ConversationAggregator::new(&source)
            .list_budgeted(&BudgetedRequest::new(1))
            .await
            .unwrap();

        assert_eq!(*source.fetches.lock().unwrap(), 2);
        assert_eq!(result.conversations.len(), 1);
        assert!(!result.resume.has_more());
        assert!(result.summary.complete);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("page 2"));
    }

    #[tokio::test]
    async fn test_exact_fill_at_page_boundary_continues_on_next_page() {
        let page_one = vec![item(10, "0123456789abcdef")];
        let cost = CharRatioEstimator::default()
            .estimate_json(&page_one[0])
            .unwrap();
        let source = StaticSource::new(vec![page_one, vec![item(11, "second")]]);
        let aggregator = ConversationAggregator::new(&source);
        let request = BudgetedRequest {
            max_units: cost,
            ..BudgetedRequest::new(1)
        };

        let result = aggregator.list_budgeted(&request).await.unwrap();
        assert_eq!(result.conversations.len(), 1);
        assert!(result.resume.has_more());
        assert!(!result.resume.budget_exhausted());
        assert_eq!(result.resume.next_page(), Some(2));
        assert_eq!(*source.requested.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_skip_through_unknown_id_keeps_page() {
        let source = StaticSource::new(vec![vec![item(1, "a"), item(2, "b")]]);
        let aggregator = ConversationAggregator::new(&source);
        let request = BudgetedRequest {
            resume_after_id: Some(999),
            ..BudgetedRequest::new(1)
        };

        let result = aggregator.list_budgeted(&request).await.unwrap();
        assert_eq!(result.conversations.len(), 2);
    }

    #[tokio::test]
    async fn test_page_budgeted_truncation() {
        let items: Vec<_> = (1..=4).map(|i| item(i, &"x".repeat(100))).collect();
        let cost = CharRatioEstimator::default().estimate_json(&items[0]).unwrap();
        let source = StaticSource::new(vec![items, vec![item(5, "next")]]);
        let aggregator = ConversationAggregator::new(&source);
        let request = BudgetedRequest {
            max_units: cost * 2 + 1,
            ..BudgetedRequest::new(1)
        };

        let page = aggregator.page_budgeted(&request).await.unwrap();
        assert_eq!(page.pagination.items_returned, 2);
        assert!(page.pagination.truncated);
        assert!(page.pagination.has_more);
        assert_eq!(page.pagination.next_page, Some(2));
        assert_eq!(page.pagination.last_item_id, Some(2));
        assert_eq!(page.pagination.token_count, cost * 2);
        assert_eq!(page.warnings.len(), 1);
        assert!(page.filtering.is_some());
    }

    #[tokio::test]
    async fn test_page_budgeted_last_page_without_filtering() {
        let source = StaticSource::new(vec![vec![item(1, "only")]]);
        let aggregator = ConversationAggregator::new(&source);
        let mut request = BudgetedRequest::new(1);
        request.filter.filter_encrypted_reports = false;

        let page = aggregator.page_budgeted(&request).await.unwrap();
        assert!(!page.pagination.has_more);
        assert!(!page.pagination.truncated);
        assert!(page.filtering.is_none());
        assert!(page.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_redaction_lowers_cost() {
        let report = format!("-----BEGIN REPORT-----{}-----END REPORT-----", "Z".repeat(4000));
        let source = StaticSource::new(vec![vec![item(1, &report)]]);
        let aggregator = ConversationAggregator::new(&source);
        let request = BudgetedRequest {
            max_units: 100,
            ..BudgetedRequest::new(1)
        };

        let result = aggregator.list_budgeted(&request).await.unwrap();
        assert_eq!(result.conversations.len(), 1);
        assert_eq!(result.filtering.reports_found, 1);
        assert!(result.filtering.tokens_saved > 900);
        assert!(result.summary.total_token_count <= 100);
    }
}
