//! Page cursor decoding from the `Link` response header

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LINK_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]*)>\s*;\s*rel="([^"]*)""#).expect("link entry pattern is valid"));

static PAGE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]page=(\d+)").expect("page parameter pattern is valid"));

/// Neighbouring page numbers advertised by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub next: Option<u32>,
    pub prev: Option<u32>,
}

impl PageCursor {
    /// Decode a `Link` header such as
    /// `<https://x/api/v2/tickets?page=2>; rel="next"`.
    ///
    /// Entries with an unknown `rel`, no `page` parameter or a page number
    /// that does not fit are skipped. Never fails.
    pub fn decode(header: Option<&str>) -> Self {
        let mut cursor = Self::default();
        let Some(header) = header else {
            return cursor;
        };

        for entry in header.split(',') {
            let Some(caps) = LINK_ENTRY.captures(entry) else {
                continue;
            };
            let page = PAGE_PARAM
                .captures(&caps[1])
                .and_then(|p| p[1].parse::<u32>().ok());
            let Some(page) = page else {
                continue;
            };

            match &caps[2] {
                "next" => cursor.next = Some(page),
                "prev" => cursor.prev = Some(page),
                _ => {}
            }
        }

        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_and_prev() {
        let cursor = PageCursor::decode(Some(
            r#"<https://x/?page=2>; rel="next", <https://x/?page=1>; rel="prev""#,
        ));
        assert_eq!(cursor, PageCursor { next: Some(2), prev: Some(1) });
    }

    #[test]
    fn test_absent_or_empty() {
        assert_eq!(PageCursor::decode(None), PageCursor::default());
        assert_eq!(PageCursor::decode(Some("")), PageCursor::default());
    }

    #[test]
    fn test_headers_without_next_or_prev() {
        for header in [
            r#"<https://x/?page=9>; rel="last""#,
            r#"<https://x/?page=1>; rel="first", <https://x/?page=3>; rel="self""#,
            "garbage, more garbage",
            "<https://x/?page=2>",
        ] {
            assert_eq!(PageCursor::decode(Some(header)), PageCursor::default(), "{header}");
        }
    }

    #[test]
    fn test_per_page_is_not_page() {
        let cursor = PageCursor::decode(Some(
            r#"<https://acme.freshdesk.com/api/v2/tickets/1/conversations?per_page=10&page=3>; rel="next""#,
        ));
        assert_eq!(cursor.next, Some(3));

        let only_per_page =
            PageCursor::decode(Some(r#"<https://x/tickets?per_page=10>; rel="next""#));
        assert_eq!(only_per_page.next, None);
    }

    #[test]
    fn test_non_numeric_and_overflow_ignored() {
        let cursor = PageCursor::decode(Some(
            r#"<https://x/?page=abc>; rel="next", <https://x/?page=99999999999>; rel="prev""#,
        ));
        assert_eq!(cursor, PageCursor::default());
    }

    #[test]
    fn test_spacing_variants() {
        let cursor = PageCursor::decode(Some(r#"<https://x/?page=4>;rel="next""#));
        assert_eq!(cursor.next, Some(4));
    }
}
