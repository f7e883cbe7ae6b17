// src/utils/url.rs

//! URL manipulation utilities.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// A numeric filename stem: `/<digits>.`
static ORDINAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)\.").expect("ordinal pattern is valid"));

/// Resolve a potentially relative URL against a base URL.
///
/// Falls back to the raw `href` when it cannot be joined.
///
/// # Examples
/// ```
/// use notice_monitor::utils::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://mmmut.ac.in/").unwrap();
/// assert_eq!(
///     resolve_url(&base, "News_content/150520259100.pdf"),
///     "https://mmmut.ac.in/News_content/150520259100.pdf"
/// );
/// ```
pub fn resolve_url(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            log::warn!("Could not resolve link {href:?}: {e}");
            href.to_string()
        }
    }
}

/// Derive the recency ordinal of a notice from its link.
///
/// The source names notice attachments with monotonically increasing
/// numbers (`.../150520259100.pdf`); the first `/<digits>.` run is taken as
/// the ordinal. Absent links, links without such a run, and runs that do
/// not fit a `u64` all map to 0.
pub fn notice_ordinal(link: Option<&str>) -> u64 {
    link.and_then(|link| ORDINAL_PATTERN.captures(link))
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let base = Url::parse("https://mmmut.ac.in/").unwrap();
        assert_eq!(
            resolve_url(&base, "News_content/1.pdf"),
            "https://mmmut.ac.in/News_content/1.pdf"
        );
        assert_eq!(
            resolve_url(&base, "../Uploads/2.pdf"),
            "https://mmmut.ac.in/Uploads/2.pdf"
        );
    }

    #[test]
    fn test_resolve_absolute_url() {
        let base = Url::parse("https://mmmut.ac.in/").unwrap();
        assert_eq!(
            resolve_url(&base, "https://other.org/x/3.pdf"),
            "https://other.org/x/3.pdf"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_raw_href() {
        let base = Url::parse("https://mmmut.ac.in/").unwrap();
        assert_eq!(resolve_url(&base, "http://[::1"), "http://[::1");
    }

    #[test]
    fn test_ordinal_from_filename_stem() {
        assert_eq!(
            notice_ordinal(Some("https://mmmut.ac.in/News_content/150520259100.pdf")),
            150520259100
        );
        assert_eq!(notice_ordinal(Some("/docs/42.PDF")), 42);
        assert_eq!(notice_ordinal(Some("/a/7.tar.gz")), 7);
    }

    #[test]
    fn test_ordinal_takes_first_match() {
        assert_eq!(notice_ordinal(Some("https://x.org/12.d/34.pdf")), 12);
    }

    #[test]
    fn test_ordinal_defaults_to_zero() {
        assert_eq!(notice_ordinal(None), 0);
        assert_eq!(notice_ordinal(Some("")), 0);
        assert_eq!(notice_ordinal(Some("https://mmmut.ac.in/notice.pdf")), 0);
        assert_eq!(notice_ordinal(Some("https://mmmut.ac.in/123")), 0);
        assert_eq!(notice_ordinal(Some("https://mmmut.ac.in/x123.pdf")), 0);
        assert_eq!(notice_ordinal(Some("/99999999999999999999999.pdf")), 0);
    }
}
