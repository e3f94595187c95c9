//! Removal of delimited report blocks from free text

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

pub const BEGIN_MARKER: &str = "-----BEGIN REPORT-----";
pub const END_MARKER: &str = "-----END REPORT-----";
pub const DEFAULT_PLACEHOLDER: &str = "[ENCRYPTED REPORT REMOVED]";

static REPORT_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)-----BEGIN REPORT-----.*?-----END REPORT-----")
        .expect("report span pattern is valid")
});

/// Result of redacting one text field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction<'a> {
    pub text: Cow<'a, str>,
    /// Number of spans replaced
    pub spans: usize,
}

impl Redaction<'_> {
    pub fn changed(&self) -> bool {
        self.spans > 0
    }
}

/// Replace every complete report span, markers included, with `placeholder`.
///
/// Spans are matched non-greedily, so two blocks in one field stay two
/// placeholders. An opening marker without a closing one is left as is.
pub fn redact<'a>(text: &'a str, placeholder: &str) -> Redaction<'a> {
    if !text.contains(BEGIN_MARKER) {
        return Redaction {
            text: Cow::Borrowed(text),
            spans: 0,
        };
    }

    let spans = REPORT_SPAN.find_iter(text).count();
    if spans == 0 {
        return Redaction {
            text: Cow::Borrowed(text),
            spans: 0,
        };
    }

    Redaction {
        text: REPORT_SPAN.replace_all(text, NoExpand(placeholder)),
        spans,
    }
}
