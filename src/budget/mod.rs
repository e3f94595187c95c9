//! Size-budgeted conversation retrieval

pub mod aggregator;
pub mod estimator;
pub mod models;

pub use aggregator::{
    BudgetedRequest, ConversationAggregator, ConversationPage, ConversationSource,
    MAX_BUDGET_UNITS, MAX_PER_PAGE,
};
pub use estimator::{estimate, CharRatioEstimator, TokenEstimator};
pub use models::{
    AggregationSummary, BudgetedConversations, BudgetedPage, ConversationItem, FilteringReport,
    PagePagination, ResumeToken,
};
