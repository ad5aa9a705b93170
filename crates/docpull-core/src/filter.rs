//! URL filtering and ordering heuristics for documentation pages.
//!
//! Sitemaps routinely mix documentation with marketing, blog, and asset URLs.
//! [`is_docs_url`] keeps the pages worth converting, and
//! [`sort_by_docs_priority`] puts introductory material first so bounded
//! extractions (capped at 100 URLs) spend their budget on the pages an agent
//! needs most.
//!
//! ```rust
//! use docpull_core::filter::is_docs_url;
//!
//! assert!(is_docs_url("https://example.com/docs/getting-started"));
//! assert!(!is_docs_url("https://example.com/blog/announcement"));
//! ```

use std::cmp::Ordering;

use url::Url;

/// Path fragments that indicate documentation content.
const DOCS_PATH_INDICATORS: &[&str] = &[
    "/docs",
    "/documentation",
    "/guide",
    "/guides",
    "/api",
    "/reference",
    "/learn",
    "/tutorial",
    "/tutorials",
    "/manual",
    "/handbook",
    "/getting-started",
    "/quickstart",
    "/examples",
    "/faq",
    "/help",
];

/// Path fragments that indicate non-documentation content.
const NON_DOCS_PATH_INDICATORS: &[&str] = &[
    "/blog",
    "/pricing",
    "/about",
    "/careers",
    "/jobs",
    "/login",
    "/signup",
    "/sign-up",
    "/signin",
    "/sign-in",
    "/register",
    "/contact",
    "/privacy",
    "/terms",
    "/legal",
    "/press",
    "/team",
    "/news",
    "/assets/",
    "/static/",
    "/_next/",
    "/_nuxt/",
    "/cdn-cgi/",
    "/wp-content/",
    "/wp-admin/",
    "/feed",
    "/rss",
];

/// File extensions that indicate non-documentation content.
const NON_DOCS_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".mjs", ".woff",
    ".woff2", ".ttf", ".pdf", ".zip", ".tar", ".gz", ".mp3", ".mp4", ".webm", ".json", ".xml",
    ".yaml", ".yml", ".map",
];

/// Path fragments that should sort first, in priority order.
const PRIORITY_PATH_INDICATORS: &[&str] = &[
    "/getting-started",
    "/quickstart",
    "/introduction",
    "/overview",
    "/installation",
    "/setup",
];

/// Decides whether a URL likely points at documentation.
///
/// Denylist matches and asset extensions exclude; allowlist matches include;
/// a URL matching neither is cautiously included when its path is a single
/// non-root segment (a `/features` page on a docs site is usually content).
#[must_use]
pub fn is_docs_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();

    if NON_DOCS_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }
    if NON_DOCS_PATH_INDICATORS.iter().any(|p| path_matches(&path, p)) {
        return false;
    }
    if DOCS_PATH_INDICATORS.iter().any(|p| path_matches(&path, p)) {
        return true;
    }

    // Neither list matched: accept shallow pages, reject deep unknown ones.
    is_single_segment(&path)
}

/// Matches `/docs`, `/docs/…`, and `…/docs` but not `/docsomething`.
fn path_matches(path: &str, fragment: &str) -> bool {
    if fragment.ends_with('/') {
        return path.contains(fragment);
    }
    path.split('/')
        .filter(|s| !s.is_empty())
        .any(|segment| format!("/{segment}") == fragment)
}

fn is_single_segment(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.len() == 1
}

/// Orders URLs so introductory documentation is fetched first.
///
/// Paths containing `/getting-started`, `/quickstart`, `/introduction`,
/// `/overview`, `/installation`, or `/setup` sort ahead of the rest in that
/// order; ties fall back to alphabetical comparison.
pub fn sort_by_docs_priority(urls: &mut [String]) {
    urls.sort_by(|a, b| {
        let rank_a = priority_rank(a);
        let rank_b = priority_rank(b);
        match rank_a.cmp(&rank_b) {
            Ordering::Equal => a.cmp(b),
            other => other,
        }
    });
}

fn priority_rank(url: &str) -> usize {
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());
    PRIORITY_PATH_INDICATORS
        .iter()
        .position(|p| path.contains(p))
        .unwrap_or(PRIORITY_PATH_INDICATORS.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_paths_are_docs() {
        assert!(is_docs_url("https://example.com/docs/intro"));
        assert!(is_docs_url("https://example.com/guide/setup"));
        assert!(is_docs_url("https://example.com/api/v2/endpoints"));
        assert!(is_docs_url("https://example.com/reference"));
        assert!(is_docs_url("https://example.com/nested/tutorial/part-1"));
    }

    #[test]
    fn denylist_paths_are_not_docs() {
        assert!(!is_docs_url("https://example.com/blog/post-1"));
        assert!(!is_docs_url("https://example.com/pricing"));
        assert!(!is_docs_url("https://example.com/login"));
        assert!(!is_docs_url("https://example.com/wp-content/uploads/x"));
    }

    #[test]
    fn asset_extensions_are_not_docs() {
        assert!(!is_docs_url("https://example.com/docs/logo.png"));
        assert!(!is_docs_url("https://example.com/bundle.min.js"));
        assert!(!is_docs_url("https://example.com/schema.json"));
    }

    #[test]
    fn single_segment_unknown_paths_are_cautiously_included() {
        assert!(is_docs_url("https://example.com/features"));
        assert!(!is_docs_url("https://example.com/"));
        assert!(!is_docs_url("https://example.com/some/deep/unknown/page"));
    }

    #[test]
    fn denylist_wins_over_cautious_inclusion() {
        // Single segment, but explicitly denylisted.
        assert!(!is_docs_url("https://example.com/pricing"));
    }

    #[test]
    fn fragment_matching_is_segment_exact() {
        // "/docsomething" must not match "/docs".
        assert!(!is_docs_url("https://example.com/docsomething/deep/page"));
    }

    #[test]
    fn priority_sort_puts_intro_material_first() {
        let mut urls = vec![
            "https://example.com/docs/zebra".to_string(),
            "https://example.com/docs/quickstart".to_string(),
            "https://example.com/docs/api".to_string(),
            "https://example.com/docs/getting-started".to_string(),
        ];
        sort_by_docs_priority(&mut urls);
        assert_eq!(urls[0], "https://example.com/docs/getting-started");
        assert_eq!(urls[1], "https://example.com/docs/quickstart");
        // Remaining ties are alphabetical.
        assert_eq!(urls[2], "https://example.com/docs/api");
        assert_eq!(urls[3], "https://example.com/docs/zebra");
    }
}
