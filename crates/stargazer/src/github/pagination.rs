//! Link header pagination.
//!
//! GitHub paginates list and search endpoints with an RFC 8288 `Link`
//! header rather than a cursor in the body. The collector follows `next`
//! verbatim and the contributor count reads the page number of `last`.

/// Pagination links extracted from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// Full URL of the next page, if any.
    pub next: Option<String>,
    /// Page number of the next page.
    pub next_page: Option<u32>,
    /// Page number of the last page.
    pub last_page: Option<u32>,
}

impl LinkPagination {
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Parse a Link header into pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/search/repositories?q=x&page=2>; rel="next", <...&page=34>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
            {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        let (Some(url), Some(rel)) = (url, rel) else {
            continue;
        };

        // A single rel may list several space-separated relation types
        for rel_type in rel.split_whitespace() {
            match rel_type {
                "next" => {
                    info.next = Some(url.to_string());
                    info.next_page = extract_page_from_url(url);
                }
                "last" => info.last_page = extract_page_from_url(url),
                _ => {}
            }
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
pub fn extract_page_from_url(url: &str) -> Option<u32> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_next_and_last() {
        let header = r#"<https://api.github.com/search/repositories?q=language%3Apython&per_page=30&page=2>; rel="next", <https://api.github.com/search/repositories?q=language%3Apython&per_page=30&page=34>; rel="last""#;
        let info = parse_link_header(header);
        assert_eq!(
            info.next.as_deref(),
            Some("https://api.github.com/search/repositories?q=language%3Apython&per_page=30&page=2")
        );
        assert_eq!(info.next_page, Some(2));
        assert_eq!(info.last_page, Some(34));
        assert!(info.has_next());
    }

    #[test]
    fn last_page_without_next() {
        let header = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=1>; rel="first""#;
        let info = parse_link_header(header);
        assert!(!info.has_next());
        assert_eq!(info.last_page, None);
    }

    #[test]
    fn contributors_last_page_is_the_count() {
        let header = r#"<https://api.github.com/repositories/1/contributors?per_page=1&anon=true&page=2>; rel="next", <https://api.github.com/repositories/1/contributors?per_page=1&anon=true&page=412>; rel="last""#;
        assert_eq!(parse_link_header(header).last_page, Some(412));
    }

    #[test]
    fn tolerates_garbage() {
        assert_eq!(parse_link_header(""), LinkPagination::default());
        assert_eq!(parse_link_header("nonsense; rel"), LinkPagination::default());
        let info = parse_link_header(r#"<not a url>; rel="next""#);
        assert_eq!(info.next.as_deref(), Some("not a url"));
        assert_eq!(info.next_page, None);
    }

    #[test]
    fn extracts_page_parameter() {
        assert_eq!(extract_page_from_url("https://a.test/x?per_page=1&page=9"), Some(9));
        assert_eq!(extract_page_from_url("https://a.test/x?per_page=1"), None);
        assert_eq!(extract_page_from_url("https://a.test/x?page=abc"), None);
    }
}
