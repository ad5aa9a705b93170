//! Best-effort HTML to Markdown conversion for scraped pages.
//!
//! This is deliberately pattern-based rather than DOM-accurate: the contract
//! is a readable Markdown rendition of real-world documentation pages, not a
//! faithful HTML parse. The conversion lives behind [`html_to_markdown`] and
//! [`scrape_page`] so a real parser could be substituted later without
//! touching callers.
//!
//! The pipeline first strips noise (scripts, styles, comments, chrome
//! elements), then locates the main content region by trying a fixed selector
//! list in priority order, then applies the conversion rules to that region.
//!
//! ```rust
//! use docpull_core::convert::html_to_markdown;
//!
//! let md = html_to_markdown("<h2>Install</h2><p>Run it.</p>", "https://example.com/docs");
//! assert!(md.contains("## Install"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::Result;
use crate::fetcher::Fetcher;

/// Minimum text length for a selector match to count as the main region.
const MIN_REGION_TEXT: usize = 100;

/// One converted page (or one llms.txt section), immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownDocument {
    /// Human-readable page title.
    pub title: String,
    /// Source URL of the page.
    pub url: String,
    /// Converted Markdown content.
    pub content: String,
    /// Whitespace-separated word count of `content`.
    pub word_count: usize,
    /// Page description from metadata, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MarkdownDocument {
    /// Builds a document, computing the word count from the content.
    #[must_use]
    pub fn new(title: String, url: String, content: String, description: Option<String>) -> Self {
        let word_count = content.split_whitespace().count();
        Self {
            title,
            url,
            content,
            word_count,
            description,
        }
    }
}

macro_rules! re {
    ($name:ident, $pattern:expr) => {
        #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

// Noise removal.
re!(SCRIPT_RE, r"(?is)<script[^>]*>.*?</script>");
re!(STYLE_RE, r"(?is)<style[^>]*>.*?</style>");
re!(COMMENT_RE, r"(?s)<!--.*?-->");
re!(NOSCRIPT_RE, r"(?is)<noscript[^>]*>.*?</noscript>");
re!(NAV_RE, r"(?is)<nav[^>]*>.*?</nav>");
re!(FOOTER_RE, r"(?is)<footer[^>]*>.*?</footer>");
re!(HEADER_RE, r"(?is)<header[^>]*>.*?</header>");
re!(ASIDE_RE, r"(?is)<aside[^>]*>.*?</aside>");

// Main content selectors, in priority order.
re!(ARTICLE_RE, r"(?is)<article[^>]*>(.*)</article>");
re!(MAIN_RE, r"(?is)<main[^>]*>(.*)</main>");
re!(ROLE_MAIN_RE, r#"(?is)<[a-z]+[^>]*role=["']?main["']?[^>]*>(.*)</[a-z]+>"#);
re!(
    DOCS_CONTAINER_RE,
    r#"(?is)<(?:div|section)[^>]*(?:class|id)=["'][^"']*(?:docs-content|markdown-body|doc-content|documentation|main-content|content)[^"']*["'][^>]*>(.*)</(?:div|section)>"#
);
re!(BODY_RE, r"(?is)<body[^>]*>(.*)</body>");

// Conversion rules.
re!(H1_RE, r"(?is)<h1[^>]*>(.*?)</h1>");
re!(H2_RE, r"(?is)<h2[^>]*>(.*?)</h2>");
re!(H3_RE, r"(?is)<h3[^>]*>(.*?)</h3>");
re!(H4_RE, r"(?is)<h4[^>]*>(.*?)</h4>");
re!(H5_RE, r"(?is)<h5[^>]*>(.*?)</h5>");
re!(H6_RE, r"(?is)<h6[^>]*>(.*?)</h6>");
re!(
    PRE_CODE_LANG_RE,
    r#"(?is)<pre[^>]*><code[^>]*class=["'][^"']*language-([a-zA-Z0-9_+-]+)[^"']*["'][^>]*>(.*?)</code>\s*</pre>"#
);
re!(PRE_CODE_RE, r"(?is)<pre[^>]*><code[^>]*>(.*?)</code>\s*</pre>");
re!(PRE_RE, r"(?is)<pre[^>]*>(.*?)</pre>");
re!(INLINE_CODE_RE, r"(?is)<code[^>]*>(.*?)</code>");
re!(LINK_RE, r#"(?is)<a\s[^>]*href=["']([^"']*)["'][^>]*>(.*?)</a>"#);
re!(IMG_RE, r"(?is)<img\s[^>]*/?>");
re!(IMG_SRC_RE, r#"(?i)src=["']([^"']*)["']"#);
re!(IMG_ALT_RE, r#"(?i)alt=["']([^"']*)["']"#);
re!(BOLD_B_RE, r"(?is)<b[^>]*>(.*?)</b>");
re!(BOLD_STRONG_RE, r"(?is)<strong[^>]*>(.*?)</strong>");
re!(ITALIC_I_RE, r"(?is)<i[^>]*>(.*?)</i>");
re!(ITALIC_EM_RE, r"(?is)<em[^>]*>(.*?)</em>");
re!(OL_RE, r"(?is)<ol[^>]*>(.*?)</ol>");
re!(UL_RE, r"(?is)<ul[^>]*>(.*?)</ul>");
re!(LI_RE, r"(?is)<li[^>]*>(.*?)</li>");
re!(BLOCKQUOTE_RE, r"(?is)<blockquote[^>]*>(.*?)</blockquote>");
re!(P_OPEN_RE, r"(?i)<p[^>]*>");
re!(P_CLOSE_RE, r"(?i)</p>");
re!(BR_RE, r"(?i)<br\s*/?>");
re!(HR_RE, r"(?i)<hr[^>]*/?>");
re!(TABLE_RE, r"(?is)<table[^>]*>(.*?)</table>");
re!(TR_RE, r"(?is)<tr[^>]*>(.*?)</tr>");
re!(CELL_RE, r"(?is)<t[hd][^>]*>(.*?)</t[hd]>");
re!(ANY_TAG_RE, r"(?s)<[^>]+>");
re!(BLANK_LINES_RE, r"\n{3,}");

// Metadata extraction.
re!(
    OG_TITLE_RE,
    r#"(?is)<meta[^>]*property=["']og:title["'][^>]*content=["']([^"']*)["']"#
);
re!(
    OG_TITLE_REV_RE,
    r#"(?is)<meta[^>]*content=["']([^"']*)["'][^>]*property=["']og:title["']"#
);
re!(TITLE_TAG_RE, r"(?is)<title[^>]*>(.*?)</title>");
re!(
    OG_DESC_RE,
    r#"(?is)<meta[^>]*property=["']og:description["'][^>]*content=["']([^"']*)["']"#
);
re!(
    META_DESC_RE,
    r#"(?is)<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#
);

/// Converts an HTML page to Markdown.
///
/// Relative hrefs and image sources are resolved against `base_url`.
#[must_use]
pub fn html_to_markdown(html: &str, base_url: &str) -> String {
    let stripped = strip_noise(html);
    let region = select_main_region(&stripped);
    convert_region(&region, base_url)
}

/// Removes scripts, styles, comments, and page chrome.
fn strip_noise(html: &str) -> String {
    let mut out = SCRIPT_RE.replace_all(html, "").into_owned();
    out = STYLE_RE.replace_all(&out, "").into_owned();
    out = COMMENT_RE.replace_all(&out, "").into_owned();
    out = NOSCRIPT_RE.replace_all(&out, "").into_owned();
    out = NAV_RE.replace_all(&out, "").into_owned();
    out = FOOTER_RE.replace_all(&out, "").into_owned();
    out = HEADER_RE.replace_all(&out, "").into_owned();
    out = ASIDE_RE.replace_all(&out, "").into_owned();
    out
}

/// Picks the main content region by trying selectors in priority order.
///
/// The first match whose visible text exceeds 100 characters wins; `<body>`
/// is the fallback, the raw document the last resort.
fn select_main_region(html: &str) -> String {
    let selectors: &[&LazyLock<Regex>] = &[
        &ARTICLE_RE,
        &MAIN_RE,
        &ROLE_MAIN_RE,
        &DOCS_CONTAINER_RE,
    ];
    for selector in selectors {
        if let Some(cap) = selector.captures(html) {
            if let Some(region) = cap.get(1) {
                let text_len = visible_text_len(region.as_str());
                if text_len > MIN_REGION_TEXT {
                    return region.as_str().to_string();
                }
            }
        }
    }
    if let Some(cap) = BODY_RE.captures(html) {
        if let Some(body) = cap.get(1) {
            return body.as_str().to_string();
        }
    }
    html.to_string()
}

fn visible_text_len(html: &str) -> usize {
    ANY_TAG_RE.replace_all(html, "").trim().len()
}

/// Applies the conversion rules to the selected region.
fn convert_region(html: &str, base_url: &str) -> String {
    let base = Url::parse(base_url).ok();
    let mut out = html.to_string();

    // Headings.
    for (re, prefix) in [
        (&H1_RE, "#"),
        (&H2_RE, "##"),
        (&H3_RE, "###"),
        (&H4_RE, "####"),
        (&H5_RE, "#####"),
        (&H6_RE, "######"),
    ] {
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                format!("\n\n{prefix} {}\n\n", inline_text(&caps[1]))
            })
            .into_owned();
    }

    // Fenced code, language-tagged first so the plain rule does not eat it.
    out = PRE_CODE_LANG_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("\n\n```{}\n{}\n```\n\n", &caps[1], code_text(&caps[2]))
        })
        .into_owned();
    out = PRE_CODE_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("\n\n```\n{}\n```\n\n", code_text(&caps[1]))
        })
        .into_owned();
    out = PRE_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("\n\n```\n{}\n```\n\n", code_text(&caps[1]))
        })
        .into_owned();

    // Inline code.
    out = INLINE_CODE_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("`{}`", code_text(&caps[1]))
        })
        .into_owned();

    // Links, resolved to absolute URLs.
    out = LINK_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let href = resolve_href(&caps[1], base.as_ref());
            format!("[{}]({href})", inline_text(&caps[2]))
        })
        .into_owned();

    // Images.
    out = IMG_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let tag = &caps[0];
            let src = IMG_SRC_RE
                .captures(tag)
                .map(|c| resolve_href(&c[1], base.as_ref()))
                .unwrap_or_default();
            let alt = IMG_ALT_RE
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            format!("![{alt}]({src})")
        })
        .into_owned();

    // Bold and italic.
    for re in [&BOLD_B_RE, &BOLD_STRONG_RE] {
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                format!("**{}**", inline_text(&caps[1]))
            })
            .into_owned();
    }
    for re in [&ITALIC_I_RE, &ITALIC_EM_RE] {
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                format!("*{}*", inline_text(&caps[1]))
            })
            .into_owned();
    }

    // Lists: ordered first so their items are numbered before the generic
    // unordered rule runs.
    out = OL_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let mut block = String::from("\n\n");
            for (i, item) in LI_RE.captures_iter(&caps[1]).enumerate() {
                block.push_str(&format!("{}. {}\n", i + 1, inline_text(&item[1])));
            }
            block.push('\n');
            block
        })
        .into_owned();
    out = UL_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let mut block = String::from("\n\n");
            for item in LI_RE.captures_iter(&caps[1]) {
                block.push_str(&format!("- {}\n", inline_text(&item[1])));
            }
            block.push('\n');
            block
        })
        .into_owned();

    // Blockquotes: prefix every line of the inner text.
    out = BLOCKQUOTE_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let inner = inline_text(&caps[1]);
            let quoted: String = inner
                .lines()
                .map(|line| format!("> {line}\n"))
                .collect();
            format!("\n\n{quoted}\n")
        })
        .into_owned();

    // Tables.
    out = TABLE_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("\n\n{}\n", convert_table(&caps[1]))
        })
        .into_owned();

    // Paragraph and line breaks.
    out = P_OPEN_RE.replace_all(&out, "\n\n").into_owned();
    out = P_CLOSE_RE.replace_all(&out, "\n\n").into_owned();
    out = BR_RE.replace_all(&out, "\n").into_owned();
    out = HR_RE.replace_all(&out, "\n\n---\n\n").into_owned();

    // Strip whatever tags remain, decode entities, tidy whitespace.
    out = ANY_TAG_RE.replace_all(&out, "").into_owned();
    out = html_escape::decode_html_entities(&out).into_owned();

    let trimmed: Vec<&str> = out.lines().map(str::trim_end).collect();
    let joined = trimmed.join("\n");
    BLANK_LINES_RE
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Converts the rows of one table body into a pipe table.
fn convert_table(inner: &str) -> String {
    let mut lines = Vec::new();
    for (i, row) in TR_RE.captures_iter(inner).enumerate() {
        let cells: Vec<String> = CELL_RE
            .captures_iter(&row[1])
            .map(|c| inline_text(&c[1]))
            .collect();
        if cells.is_empty() {
            continue;
        }
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(cells.len())));
        }
    }
    lines.join("\n")
}

/// Flattens inline markup to plain text: strips tags, decodes entities,
/// collapses internal whitespace.
fn inline_text(html: &str) -> String {
    let stripped = ANY_TAG_RE.replace_all(html, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Code block text: tags stripped and entities decoded, whitespace preserved.
fn code_text(html: &str) -> String {
    let stripped = ANY_TAG_RE.replace_all(html, "");
    html_escape::decode_html_entities(&stripped)
        .trim_matches('\n')
        .to_string()
}

/// Resolves an href against the page origin; absolute URLs pass through.
fn resolve_href(href: &str, base: Option<&Url>) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match base.and_then(|b| b.join(href).ok()) {
        Some(resolved) => resolved.to_string(),
        None => href.to_string(),
    }
}

/// Extracts the page title.
///
/// Preference: `og:title` meta → `<title>` (with a trailing `- Site` or
/// `| Site` suffix trimmed) → first `<h1>` → derived from the last URL path
/// segment.
#[must_use]
pub fn extract_title(html: &str, url: &str) -> String {
    for re in [&OG_TITLE_RE, &OG_TITLE_REV_RE] {
        if let Some(cap) = re.captures(html) {
            let title = inline_text(&cap[1]);
            if !title.is_empty() {
                return title;
            }
        }
    }

    if let Some(cap) = TITLE_TAG_RE.captures(html) {
        let title = trim_site_suffix(&inline_text(&cap[1]));
        if !title.is_empty() {
            return title;
        }
    }

    if let Some(cap) = H1_RE.captures(html) {
        let title = inline_text(&cap[1]);
        if !title.is_empty() {
            return title;
        }
    }

    title_from_url(url)
}

/// Extracts the page description: `og:description`, then the standard
/// `<meta name="description">`.
#[must_use]
pub fn extract_description(html: &str) -> Option<String> {
    for re in [&OG_DESC_RE, &META_DESC_RE] {
        if let Some(cap) = re.captures(html) {
            let desc = inline_text(&cap[1]);
            if !desc.is_empty() {
                return Some(desc);
            }
        }
    }
    None
}

/// Drops a trailing `- Site Name` / `| Site Name` suffix from a title.
fn trim_site_suffix(title: &str) -> String {
    for separator in [" - ", " | ", " \u{2014} "] {
        if let Some(idx) = title.rfind(separator) {
            let head = title[..idx].trim();
            if !head.is_empty() {
                return head.to_string();
            }
        }
    }
    title.to_string()
}

/// Derives a human title from the last path segment of a URL.
fn title_from_url(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|s| s.filter(|p| !p.is_empty()).next_back().map(String::from))
        })
        .filter(|s| !s.is_empty());

    let Some(segment) = segment else {
        return Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_else(|| "Untitled".to_string());
    };

    segment
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |c| {
                c.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetches a page and converts it to a [`MarkdownDocument`].
///
/// Non-2xx responses propagate as errors carrying the URL and status; callers
/// in the extraction pipeline catch these per page.
pub async fn scrape_page(fetcher: &Fetcher, url: &str) -> Result<MarkdownDocument> {
    let html = fetcher.fetch(url).await?;
    let content = html_to_markdown(&html, url);
    let title = extract_title(&html, url);
    let description = extract_description(&html);
    debug!(url = %url, words = content.split_whitespace().count(), "Converted page to markdown");
    Ok(MarkdownDocument::new(
        title,
        url.to_string(),
        content,
        description,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "https://a.com/y";

    #[test]
    fn headings_convert_at_every_level() {
        assert!(html_to_markdown("<h2>X</h2>", BASE).contains("## X"));
        assert!(html_to_markdown("<h1>Top</h1>", BASE).contains("# Top"));
        assert!(html_to_markdown("<h6>Deep</h6>", BASE).contains("###### Deep"));
    }

    #[test]
    fn fenced_code_keeps_language() {
        let html = r#"<pre><code class="language-ts">const x = 1;</code></pre>"#;
        let md = html_to_markdown(html, BASE);
        assert!(md.contains("```ts\nconst x = 1;\n```"), "got: {md}");
    }

    #[test]
    fn plain_pre_code_is_fenced_without_language() {
        let md = html_to_markdown("<pre><code>plain()</code></pre>", BASE);
        assert!(md.contains("```\nplain()\n```"));
    }

    #[test]
    fn code_entities_are_decoded() {
        let md = html_to_markdown("<pre><code>a &lt; b &amp;&amp; c</code></pre>", BASE);
        assert!(md.contains("a < b && c"));
    }

    #[test]
    fn inline_code_uses_backticks() {
        let md = html_to_markdown("<p>Use <code>cargo</code> here.</p>", BASE);
        assert!(md.contains("`cargo`"));
    }

    #[test]
    fn relative_links_resolve_against_origin() {
        let md = html_to_markdown(r#"<a href="/x">t</a>"#, "https://a.com/y");
        assert!(md.contains("[t](https://a.com/x)"), "got: {md}");
    }

    #[test]
    fn absolute_links_pass_through() {
        let md = html_to_markdown(r#"<a href="https://other.com/p">t</a>"#, BASE);
        assert!(md.contains("[t](https://other.com/p)"));
    }

    #[test]
    fn images_convert_with_alt() {
        let md = html_to_markdown(r#"<img src="/logo.png" alt="Logo">"#, "https://a.com/y");
        assert!(md.contains("![Logo](https://a.com/logo.png)"));
    }

    #[test]
    fn bold_and_italic() {
        let md = html_to_markdown("<strong>hot</strong> and <em>warm</em>", BASE);
        assert!(md.contains("**hot**"));
        assert!(md.contains("*warm*"));
    }

    #[test]
    fn ordered_and_unordered_lists() {
        let md = html_to_markdown("<ol><li>one</li><li>two</li></ol>", BASE);
        assert!(md.contains("1. one"));
        assert!(md.contains("2. two"));

        let md = html_to_markdown("<ul><li>alpha</li><li>beta</li></ul>", BASE);
        assert!(md.contains("- alpha"));
        assert!(md.contains("- beta"));
    }

    #[test]
    fn blockquotes_prefix_every_line() {
        let md = html_to_markdown("<blockquote>wise words</blockquote>", BASE);
        assert!(md.contains("> wise words"));
    }

    #[test]
    fn hr_becomes_rule() {
        let md = html_to_markdown("<p>a</p><hr><p>b</p>", BASE);
        assert!(md.contains("---"));
    }

    #[test]
    fn tables_become_pipe_tables() {
        let html = "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ada</td><td>36</td></tr></table>";
        let md = html_to_markdown(html, BASE);
        assert!(md.contains("| Name | Age |"));
        assert!(md.contains("| --- | --- |"));
        assert!(md.contains("| Ada | 36 |"));
    }

    #[test]
    fn scripts_styles_and_chrome_are_stripped() {
        let html = r#"
            <nav><a href="/home">Home</a></nav>
            <script>alert("x")</script>
            <style>.a { color: red }</style>
            <!-- hidden -->
            <noscript>enable js</noscript>
            <p>Real content</p>
            <footer>Copyright</footer>
        "#;
        let md = html_to_markdown(html, BASE);
        assert!(md.contains("Real content"));
        assert!(!md.contains("alert"));
        assert!(!md.contains("color: red"));
        assert!(!md.contains("hidden"));
        assert!(!md.contains("Home"));
        assert!(!md.contains("Copyright"));
    }

    #[test]
    fn article_region_wins_over_body() {
        let filler = "lorem ipsum dolor sit amet ".repeat(10);
        let html = format!(
            "<body><div>sidebar junk</div><article><p>{filler}</p></article></body>"
        );
        let md = html_to_markdown(&html, BASE);
        assert!(md.contains("lorem ipsum"));
        assert!(!md.contains("sidebar junk"));
    }

    #[test]
    fn short_article_falls_back_to_body() {
        let html = "<body><article><p>tiny</p></article><p>the rest of the page</p></body>";
        let md = html_to_markdown(html, BASE);
        // Article text is under the 100-char threshold, so body is used.
        assert!(md.contains("the rest of the page"));
    }

    #[test]
    fn excess_blank_lines_collapse() {
        let md = html_to_markdown("<p>a</p><p></p><p></p><p>b</p>", BASE);
        assert!(!md.contains("\n\n\n"));
    }

    #[test]
    fn title_prefers_og_title() {
        let html = r#"
            <meta property="og:title" content="OG Title">
            <title>Tag Title - Site</title>
            <h1>H1 Title</h1>
        "#;
        assert_eq!(extract_title(html, BASE), "OG Title");
    }

    #[test]
    fn title_trims_site_suffix() {
        let html = "<title>Getting Started - Example Docs</title>";
        assert_eq!(extract_title(html, BASE), "Getting Started");

        let html = "<title>Getting Started | Example</title>";
        assert_eq!(extract_title(html, BASE), "Getting Started");
    }

    #[test]
    fn title_falls_back_to_h1_then_url() {
        assert_eq!(extract_title("<h1>From H1</h1>", BASE), "From H1");
        assert_eq!(
            extract_title("", "https://a.com/docs/getting-started"),
            "Getting Started"
        );
        assert_eq!(extract_title("", "https://a.com/"), "a.com");
    }

    #[test]
    fn description_prefers_og() {
        let html = r#"
            <meta property="og:description" content="OG desc">
            <meta name="description" content="Meta desc">
        "#;
        assert_eq!(extract_description(html), Some("OG desc".to_string()));
        assert_eq!(
            extract_description(r#"<meta name="description" content="Meta desc">"#),
            Some("Meta desc".to_string())
        );
        assert_eq!(extract_description("<p>no meta</p>"), None);
    }

    #[tokio::test]
    async fn scrape_page_builds_document() {
        let server = MockServer::start().await;
        let html = r#"
            <html><head><title>Install Guide - Docs</title></head>
            <body><main><h2>Install</h2><p>Run the installer and follow the prompts
            until the setup completes. This paragraph pads the main region past the
            minimum content threshold used by the selector.</p></main></body></html>
        "#;
        Mock::given(method("GET"))
            .and(path("/docs/install"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/docs/install", server.uri());
        let doc = scrape_page(&fetcher, &url).await.unwrap();

        assert_eq!(doc.title, "Install Guide");
        assert!(doc.content.contains("## Install"));
        assert!(doc.word_count > 10);
        assert_eq!(doc.url, url);
    }

    #[tokio::test]
    async fn scrape_page_propagates_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let result = scrape_page(&fetcher, &format!("{}/gone", server.uri())).await;
        assert!(result.is_err());
    }
}
