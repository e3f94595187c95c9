//! HTML to plain text for search results

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::node::Node;
use scraper::{ElementRef, Html};

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "template", "title"];

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

/// `<` that would open a tag and `&` that would start a character reference
static MARKUP_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z/!?]|&[A-Za-z0-9#]").expect("markup pattern is valid"));

/// Convert markup to readable plain text.
///
/// Block elements and `<br>`/`<hr>` become line breaks, entities are decoded,
/// lines are trimmed and runs of blank lines collapse to one. Input with no
/// tag or entity syntax is returned unchanged.
///
/// Decoded text that would parse as markup again, such as `<john@acme.com>`
/// from `&lt;john@acme.com&gt;`, keeps its escaped form so that stripping the
/// output a second time changes nothing.
pub fn strip_tags(input: &str) -> String {
    if !input.contains('<') && !input.contains('&') {
        return input.to_string();
    }

    let fragment = Html::parse_fragment(input);
    let mut raw = String::with_capacity(input.len());
    collect_text(fragment.root_element(), &mut raw);
    normalize(&escape_markup(&raw))
}

fn escape_markup(text: &str) -> std::borrow::Cow<'_, str> {
    MARKUP_LIKE.replace_all(text, |caps: &Captures<'_>| {
        let matched = &caps[0];
        let escaped = if matched.starts_with('<') { "&lt;" } else { "&amp;" };
        format!("{escaped}{}", &matched[1..])
    })
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" || name == "hr" {
                    out.push('\n');
                    continue;
                }
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child_element, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn normalize(raw: &str) -> String {
    let trimmed_lines = raw.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    BLANK_RUNS
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}
