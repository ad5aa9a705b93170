//! Sitemap parsing and bounded recursive resolution.
//!
//! Two layers: [`parse_sitemap_xml`] is a pure transform of one XML document,
//! and [`fetch_sitemap`] walks sitemap indexes to collect page URLs. Index
//! documents (`<sitemapindex>`) yield only child sitemap URLs, never page
//! entries; leaf documents (`<urlset>`) yield one entry per `<url>` with a
//! `<loc>`.
//!
//! Resolution is an explicit worklist, not closure recursion, so termination
//! is auditable from three hard bounds: depth ≤ 3, at most 5 child sitemaps
//! expanded per level, and at most `max_urls` (default 100) collected URLs.
//! A fetch or parse failure degrades to an empty result for that one sitemap
//! and never aborts the walk.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::fetcher::Fetcher;
use crate::filter::is_docs_url;
use crate::{Error, Result};

/// Maximum recursion depth through sitemap indexes.
const MAX_DEPTH: u8 = 3;
/// Maximum child sitemaps expanded per index document.
const MAX_CHILDREN_PER_LEVEL: usize = 5;
/// Default ceiling on collected URLs.
pub const DEFAULT_MAX_URLS: usize = 100;

/// A single entry from a leaf sitemap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    /// The URL of the page.
    pub url: String,
    /// Last modification date, when the sitemap declares one.
    pub lastmod: Option<DateTime<Utc>>,
    /// How frequently the page is said to change.
    pub changefreq: Option<ChangeFrequency>,
    /// Priority relative to other URLs on the site (clamped to 0.0–1.0).
    pub priority: Option<f32>,
}

/// Change frequency hints from a sitemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    /// Changes every time it is accessed.
    Always,
    /// Changes hourly.
    Hourly,
    /// Changes daily.
    Daily,
    /// Changes weekly.
    Weekly,
    /// Changes monthly.
    Monthly,
    /// Changes yearly.
    Yearly,
    /// Archived, will not change.
    Never,
}

impl std::str::FromStr for ChangeFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            _ => Err(Error::Parse(format!("Invalid changefreq value: {s}"))),
        }
    }
}

/// Result of parsing one sitemap document.
///
/// Exactly one of the two collections is populated: an index yields
/// `nested_sitemaps`, a leaf yields `entries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitemapDocument {
    /// Page entries from a leaf sitemap.
    pub entries: Vec<SitemapEntry>,
    /// Child sitemap URLs from an index document.
    pub nested_sitemaps: Vec<String>,
}

impl SitemapDocument {
    /// Whether this document is a sitemap index.
    #[must_use]
    pub fn is_index(&self) -> bool {
        !self.nested_sitemaps.is_empty()
    }
}

/// Options for [`fetch_sitemap`].
#[derive(Debug, Clone, Copy)]
pub struct SitemapOptions {
    /// Stop collecting once this many URLs are gathered.
    pub max_urls: usize,
    /// Keep only URLs passing the documentation filter.
    pub filter_docs: bool,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            max_urls: DEFAULT_MAX_URLS,
            filter_docs: true,
        }
    }
}

/// Parses one sitemap XML document.
///
/// An index document (`<sitemapindex>`) yields only `nested_sitemaps`; a leaf
/// (`<urlset>`) yields one entry per `<url>` carrying a `<loc>`, with
/// optional `lastmod`, `changefreq`, and `priority`. Entries missing `<loc>`
/// are skipped.
#[instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_sitemap_xml(xml: &str) -> Result<SitemapDocument> {
    let is_index = xml.contains("<sitemapindex");
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = SitemapDocument::default();
    let mut buf = Vec::new();

    // State for the entry currently being assembled.
    let mut in_entry = false;
    let mut current_element: Option<String> = None;
    let mut loc: Option<String> = None;
    let mut lastmod: Option<DateTime<Utc>> = None;
    let mut changefreq: Option<ChangeFrequency> = None;
    let mut priority: Option<f32> = None;

    let entry_tag = if is_index { "sitemap" } else { "url" };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == entry_tag {
                    in_entry = true;
                    loc = None;
                    lastmod = None;
                    changefreq = None;
                    priority = None;
                } else if in_entry
                    && matches!(name.as_str(), "loc" | "lastmod" | "changefreq" | "priority")
                {
                    current_element = Some(name);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == entry_tag && in_entry {
                    if let Some(url) = loc.take() {
                        if is_index {
                            doc.nested_sitemaps.push(url);
                        } else {
                            doc.entries.push(SitemapEntry {
                                url,
                                lastmod: lastmod.take(),
                                changefreq: changefreq.take(),
                                priority: priority.take(),
                            });
                        }
                    }
                    in_entry = false;
                }
                current_element = None;
            }
            Ok(Event::Text(e)) => {
                if let Some(ref element) = current_element {
                    let text = e.unescape().map_err(|e| Error::Parse(e.to_string()))?;
                    let text = text.trim();
                    match element.as_str() {
                        "loc" => loc = Some(text.to_string()),
                        "lastmod" => lastmod = parse_lastmod(text),
                        "changefreq" => changefreq = text.parse().ok(),
                        "priority" => priority = parse_priority(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Parse(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

/// Fetches a sitemap URL and recursively resolves indexes into page entries.
///
/// Walks an explicit worklist of `(url, depth)` items. A `visited` set blocks
/// self-referential loops; child sitemaps beyond five per index and depth
/// beyond three are dropped; collection short-circuits at
/// [`SitemapOptions::max_urls`]. Never raises: any failed fetch or parse
/// contributes nothing for that sitemap.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_sitemap(
    fetcher: &Fetcher,
    url: &str,
    options: &SitemapOptions,
) -> Vec<SitemapEntry> {
    let mut collected: Vec<SitemapEntry> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut worklist: VecDeque<(String, u8)> = VecDeque::new();
    worklist.push_back((url.to_string(), 1));

    while let Some((sitemap_url, depth)) = worklist.pop_front() {
        if collected.len() >= options.max_urls {
            break;
        }
        if !visited.insert(sitemap_url.clone()) {
            continue;
        }

        let xml = match fetcher.fetch(&sitemap_url).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(url = %sitemap_url, error = %e, "Sitemap fetch failed, treating as empty");
                continue;
            }
        };

        let doc = match parse_sitemap_xml(&xml) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(url = %sitemap_url, error = %e, "Sitemap parse failed, treating as empty");
                continue;
            }
        };

        if doc.is_index() {
            if depth >= MAX_DEPTH {
                debug!(url = %sitemap_url, depth, "Sitemap index at depth limit, not descending");
                continue;
            }
            for child in doc.nested_sitemaps.into_iter().take(MAX_CHILDREN_PER_LEVEL) {
                worklist.push_back((child, depth + 1));
            }
            continue;
        }

        for entry in doc.entries {
            if collected.len() >= options.max_urls {
                break;
            }
            if options.filter_docs && !is_docs_url(&entry.url) {
                continue;
            }
            collected.push(entry);
        }
    }

    debug!(count = collected.len(), "Sitemap resolution complete");
    collected
}

/// Parses a lastmod date in the formats sitemaps actually use.
fn parse_lastmod(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    debug!(date_str = %s, "Could not parse lastmod date");
    None
}

/// Parses a priority value, clamping to the 0.0–1.0 range.
fn parse_priority(s: &str) -> Option<f32> {
    s.parse::<f32>().ok().map(|p| p.clamp(0.0, 1.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn leaf_xml(urls: &[&str]) -> String {
        let body: String = urls
            .iter()
            .map(|u| format!("<url><loc>{u}</loc></url>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{body}</urlset>"#
        )
    }

    fn index_xml(sitemaps: &[String]) -> String {
        let body: String = sitemaps
            .iter()
            .map(|u| format!("<sitemap><loc>{u}</loc></sitemap>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{body}</sitemapindex>"#
        )
    }

    #[test]
    fn leaf_yields_entries_in_order() {
        let xml = leaf_xml(&[
            "https://example.com/docs/a",
            "https://example.com/docs/b",
            "https://example.com/docs/c",
        ]);
        let doc = parse_sitemap_xml(&xml).unwrap();
        assert!(!doc.is_index());
        assert_eq!(doc.entries.len(), 3);
        assert_eq!(doc.entries[0].url, "https://example.com/docs/a");
        assert_eq!(doc.entries[2].url, "https://example.com/docs/c");
        assert!(doc.nested_sitemaps.is_empty());
    }

    #[test]
    fn index_yields_only_nested_sitemaps() {
        let xml = index_xml(&[
            "https://example.com/sitemap-1.xml".to_string(),
            "https://example.com/sitemap-2.xml".to_string(),
        ]);
        let doc = parse_sitemap_xml(&xml).unwrap();
        assert!(doc.is_index());
        assert_eq!(doc.nested_sitemaps.len(), 2);
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn optional_fields_are_parsed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/docs/a</loc>
            <lastmod>2024-01-15</lastmod>
            <changefreq>weekly</changefreq>
            <priority>0.8</priority>
          </url>
        </urlset>"#;
        let doc = parse_sitemap_xml(xml).unwrap();
        let entry = &doc.entries[0];
        assert!(entry.lastmod.is_some());
        assert_eq!(entry.changefreq, Some(ChangeFrequency::Weekly));
        assert_eq!(entry.priority, Some(0.8));
    }

    #[test]
    fn entries_without_loc_are_skipped() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><lastmod>2024-01-15</lastmod></url>
          <url><loc>https://example.com/docs/a</loc></url>
        </urlset>"#;
        let doc = parse_sitemap_xml(xml).unwrap();
        assert_eq!(doc.entries.len(), 1);
    }

    #[test]
    fn priority_is_clamped() {
        assert_eq!(parse_priority("1.5"), Some(1.0));
        assert_eq!(parse_priority("-0.5"), Some(0.0));
        assert_eq!(parse_priority("nope"), None);
    }

    #[test]
    fn lastmod_formats() {
        assert!(parse_lastmod("2024-01-15").is_some());
        assert!(parse_lastmod("2024-01-15T10:30:00Z").is_some());
        assert!(parse_lastmod("2024-01-15T10:30:00+02:00").is_some());
        assert!(parse_lastmod("2024-01-15T10:30:00.123").is_some());
        assert!(parse_lastmod("yesterday").is_none());
    }

    #[test]
    fn xml_entities_are_unescaped() {
        let xml = leaf_xml(&["https://example.com/docs?a=1&amp;b=2"]);
        let doc = parse_sitemap_xml(&xml).unwrap();
        assert_eq!(doc.entries[0].url, "https://example.com/docs?a=1&b=2");
    }

    #[tokio::test]
    async fn fetches_leaf_sitemap() {
        let server = MockServer::start().await;
        let xml = leaf_xml(&["https://example.com/docs/a", "https://example.com/blog/x"]);
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/sitemap.xml", server.uri());

        let entries = fetch_sitemap(&fetcher, &url, &SitemapOptions::default()).await;
        // /blog/x is filtered out.
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.com/docs/a");

        let unfiltered = fetch_sitemap(
            &fetcher,
            &url,
            &SitemapOptions {
                filter_docs: false,
                ..SitemapOptions::default()
            },
        )
        .await;
        assert_eq!(unfiltered.len(), 2);
    }

    #[tokio::test]
    async fn resolves_index_and_tolerates_child_failure() {
        let server = MockServer::start().await;
        let index = index_xml(&[
            format!("{}/sitemap-1.xml", server.uri()),
            format!("{}/sitemap-2.xml", server.uri()),
        ]);
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-1.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-2.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(leaf_xml(&["https://example.com/docs/a"])),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/sitemap.xml", server.uri());
        let entries = fetch_sitemap(&fetcher, &url, &SitemapOptions::default()).await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.com/docs/a");
    }

    #[tokio::test]
    async fn self_referential_index_terminates() {
        let server = MockServer::start().await;
        let index = index_xml(&[format!("{}/sitemap.xml", server.uri())]);
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/sitemap.xml", server.uri());
        let entries = fetch_sitemap(&fetcher, &url, &SitemapOptions::default()).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn respects_max_urls_ceiling() {
        let server = MockServer::start().await;
        let urls: Vec<String> = (0..200)
            .map(|i| format!("https://example.com/docs/page-{i:03}"))
            .collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(leaf_xml(&refs)))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/sitemap.xml", server.uri());
        let entries = fetch_sitemap(&fetcher, &url, &SitemapOptions::default()).await;
        assert_eq!(entries.len(), 100);
    }

    #[tokio::test]
    async fn depth_limit_stops_descent() {
        let server = MockServer::start().await;
        // Three levels of index before any leaf: the leaf lives at depth 4
        // and must never be reached.
        Mock::given(method("GET"))
            .and(path("/level-1.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(index_xml(&[format!("{}/level-2.xml", server.uri())])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/level-2.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(index_xml(&[format!("{}/level-3.xml", server.uri())])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/level-3.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(index_xml(&[format!("{}/level-4.xml", server.uri())])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/level-4.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(leaf_xml(&["https://example.com/docs/deep"])),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/level-1.xml", server.uri());
        let entries = fetch_sitemap(&fetcher, &url, &SitemapOptions::default()).await;
        assert!(entries.is_empty(), "depth 4 leaf must not be fetched");
    }

    #[tokio::test]
    async fn expands_at_most_five_children_per_level() {
        let server = MockServer::start().await;
        let children: Vec<String> = (0..8)
            .map(|i| format!("{}/child-{i}.xml", server.uri()))
            .collect();
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index_xml(&children)))
            .mount(&server)
            .await;
        for i in 0..8 {
            let page = format!("https://example.com/docs/from-child-{i}");
            Mock::given(method("GET"))
                .and(path(format!("/child-{i}.xml")))
                .respond_with(ResponseTemplate::new(200).set_body_string(leaf_xml(&[&page])))
                .mount(&server)
                .await;
        }

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/sitemap.xml", server.uri());
        let entries = fetch_sitemap(&fetcher, &url, &SitemapOptions::default()).await;
        assert_eq!(entries.len(), 5, "only five children may be expanded");
    }
}
