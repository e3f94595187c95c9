//! Text transforms applied to conversation content
//!
//! Transforms run on a copy of each item and before budgeting, because they
//! change the bytes being counted:
//! 1. report redaction in `body`, `body_text` and `description`
//! 2. link extraction from the HTML `body`
//! 3. removal of the HTML `body` unless raw markup was requested
//!
//! Tag stripping is separate and only used to clean up search results.

pub mod links;
pub mod redaction;
pub mod strip;

pub use links::{extract_links, Link};
pub use redaction::{redact, Redaction, DEFAULT_PLACEHOLDER};
pub use strip::strip_tags;

use crate::budget::estimator::TokenEstimator;
use crate::budget::models::{ConversationItem, TEXT_FIELDS};
use serde::Deserialize;
use serde_json::{json, Value};

/// Per-call transform switches
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransformOptions {
    #[serde(default = "default_true")]
    pub filter_encrypted_reports: bool,

    #[serde(default = "default_placeholder")]
    pub report_placeholder: String,

    #[serde(default)]
    pub include_html_body: bool,

    #[serde(default = "default_true")]
    pub extract_links: bool,
}

fn default_true() -> bool { true }
fn default_placeholder() -> String { DEFAULT_PLACEHOLDER.to_string() }

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            filter_encrypted_reports: default_true(),
            report_placeholder: default_placeholder(),
            include_html_body: false,
            extract_links: default_true(),
        }
    }
}

/// A transformed item plus what redaction did to it
#[derive(Debug, Clone)]
pub struct Transformed {
    pub item: ConversationItem,
    pub reports_redacted: usize,
    pub units_saved: usize,
}

/// Run the transform pipeline on a copy of `raw`
pub fn transform_item(
    raw: &ConversationItem,
    options: &TransformOptions,
    estimator: &dyn TokenEstimator,
) -> Transformed {
    let mut item = raw.clone();
    let mut reports_redacted = 0;
    let mut units_saved = 0;

    if options.filter_encrypted_reports {
        for field in TEXT_FIELDS {
            let Some(original) = item.text(field) else {
                continue;
            };
            let redaction = redact(original, &options.report_placeholder);
            if !redaction.changed() {
                continue;
            }
            reports_redacted += redaction.spans;
            let redacted = redaction.text.into_owned();
            units_saved += estimator
                .estimate(original)
                .saturating_sub(estimator.estimate(&redacted));
            item.insert(field, Value::String(redacted));
        }
    }

    if options.extract_links {
        let links = item.text("body").map(extract_links).unwrap_or_default();
        if !links.is_empty() {
            let links = links
                .into_iter()
                .map(|link| json!({"text": link.text, "url": link.url}))
                .collect();
            item.insert("links", Value::Array(links));
        }
    }

    if !options.include_html_body {
        item.remove("body");
    }

    Transformed {
        item,
        reports_redacted,
        units_saved,
    }
}
