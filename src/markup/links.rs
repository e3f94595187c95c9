//! Anchor extraction from HTML bodies

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

static ANCHOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("a[href]").ok());

/// A hyperlink found in a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

/// Collect `{text, url}` for every anchor with a non-empty `href`.
///
/// The HTML parser is error tolerant, so malformed markup yields whatever
/// anchors were recognizable and never an error.
pub fn extract_links(html: &str) -> Vec<Link> {
    if !html.to_ascii_lowercase().contains("<a") {
        return Vec::new();
    }
    let Some(selector) = ANCHOR.as_ref() else {
        return Vec::new();
    };

    let fragment = Html::parse_fragment(html);
    fragment
        .select(selector)
        .filter_map(|anchor| {
            let url = anchor.value().attr("href")?.trim();
            if url.is_empty() {
                return None;
            }
            Some(Link {
                text: anchor.text().collect::<String>().trim().to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
