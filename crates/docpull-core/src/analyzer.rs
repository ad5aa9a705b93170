//! Extraction strategy selection.
//!
//! Given an arbitrary input URL, [`analyze_url`] probes the host for the
//! cheapest viable extraction route and assigns exactly one [`Strategy`].
//! Probes run in a fixed order with no backtracking; the first hit wins and
//! [`Strategy::HtmlScrape`] is the unconditional terminal fallback, so every
//! valid URL gets a total strategy assignment.
//!
//! Probe order:
//! 1. A `Link` response header on the input URL advertising an llms.txt
//!    location (verified before trusting it).
//! 2. Well-known llms.txt paths, checked with HEAD (GET fallback).
//! 3. Common sitemap locations, accepted only when the sitemap yields at
//!    least one documentation URL after filtering.
//! 4. Documentation path discovery (`docs.` subdomain, `/docs`, ...).
//! 5. Direct HTML scraping of the input page.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::fetcher::Fetcher;
use crate::sitemap::{SitemapOptions, fetch_sitemap};
use crate::{Error, Result};

/// Well-known llms.txt locations, richest variant first.
const LLMS_TXT_PATHS: &[&str] = &["/llms-full.txt", "/llms.txt", "/.well-known/llms.txt"];

/// Common sitemap locations.
const SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/docs/sitemap.xml",
];

/// Documentation landing paths probed during docs discovery.
const DOCS_PATHS: &[&str] = &["/docs", "/documentation", "/doc", "/guide", "/api"];

/// How a site's documentation will be extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// The site publishes an llms.txt / llms-full.txt file.
    LlmsTxt,
    /// A sitemap enumerates documentation pages.
    Sitemap,
    /// A documentation landing page was discovered and should be re-analyzed.
    DocsDiscovery,
    /// Scrape the input page directly.
    HtmlScrape,
    /// No analysis has run yet.
    #[default]
    Unknown,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LlmsTxt => "llms-txt",
            Self::Sitemap => "sitemap",
            Self::DocsDiscovery => "docs-discovery",
            Self::HtmlScrape => "html-scrape",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Outcome of analyzing one URL, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAnalysis {
    /// The normalized input URL.
    pub original_url: String,
    /// Scheme + host (+ port) of the input.
    pub base_url: String,
    /// Chosen extraction strategy.
    pub strategy: Strategy,
    /// Location of the llms.txt file, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llms_txt_url: Option<String>,
    /// Location of the sitemap that produced `pages`, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap_url: Option<String>,
    /// Discovered documentation landing page, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    /// Page URLs to extract. Non-empty for the sitemap and html-scrape
    /// strategies.
    #[serde(default)]
    pub pages: Vec<String>,
}

impl UrlAnalysis {
    fn new(original_url: String, base_url: String) -> Self {
        Self {
            original_url,
            base_url,
            strategy: Strategy::Unknown,
            llms_txt_url: None,
            sitemap_url: None,
            docs_url: None,
            pages: Vec::new(),
        }
    }
}

/// Validates and normalizes a raw input URL.
///
/// Bare domains get an `https://` scheme; only http/https are accepted and a
/// host is required. The host is lowercased by the parser.
pub fn normalize_input_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url =
        Url::parse(&candidate).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "{trimmed}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(Error::InvalidUrl(format!("{trimmed}: missing host")));
    }
    Ok(url)
}

/// Probes a URL and assigns its extraction strategy.
///
/// Returns an error only for invalid input; every probe failure just moves
/// on to the next candidate, down to the html-scrape fallback.
#[instrument(skip_all, fields(url = %raw))]
pub async fn analyze_url(fetcher: &Fetcher, raw: &str) -> Result<UrlAnalysis> {
    let url = normalize_input_url(raw)?;
    let base = origin_string(&url);
    let normalized = url.to_string();
    let mut analysis = UrlAnalysis::new(normalized.clone(), base.clone());

    // An advertised llms.txt location beats path guessing.
    if let Some(advertised) = advertised_llms_txt(fetcher, &normalized, &url).await {
        debug!(llms_txt = %advertised, "Found llms.txt via Link header");
        analysis.strategy = Strategy::LlmsTxt;
        analysis.llms_txt_url = Some(advertised);
        return Ok(analysis);
    }

    for candidate_path in LLMS_TXT_PATHS {
        let candidate = format!("{base}{candidate_path}");
        if fetcher.head_ok(&candidate).await {
            debug!(llms_txt = %candidate, "Found llms.txt");
            analysis.strategy = Strategy::LlmsTxt;
            analysis.llms_txt_url = Some(candidate);
            return Ok(analysis);
        }
    }

    for candidate_path in SITEMAP_PATHS {
        let candidate = format!("{base}{candidate_path}");
        let entries = fetch_sitemap(fetcher, &candidate, &SitemapOptions::default()).await;
        if !entries.is_empty() {
            debug!(sitemap = %candidate, pages = entries.len(), "Found usable sitemap");
            analysis.strategy = Strategy::Sitemap;
            analysis.sitemap_url = Some(candidate);
            analysis.pages = entries.into_iter().map(|e| e.url).collect();
            return Ok(analysis);
        }
    }

    for candidate in docs_candidates(&url, &base) {
        if trim_slash(&candidate) == trim_slash(&normalized) {
            continue;
        }
        if fetcher.get_ok(&candidate).await {
            debug!(docs = %candidate, "Found documentation path");
            analysis.strategy = Strategy::DocsDiscovery;
            analysis.docs_url = Some(candidate);
            return Ok(analysis);
        }
    }

    debug!("No structured source found, falling back to page scrape");
    analysis.strategy = Strategy::HtmlScrape;
    analysis.pages = vec![normalized];
    Ok(analysis)
}

/// Checks the input URL's `Link` response header for an advertised llms.txt
/// location and verifies it responds before trusting it.
async fn advertised_llms_txt(fetcher: &Fetcher, url: &str, base: &Url) -> Option<String> {
    let header = fetcher.link_header(url).await?;
    let advertised = parse_llms_link_header(&header, base)?;
    if fetcher.head_ok(&advertised).await {
        Some(advertised)
    } else {
        None
    }
}

/// Parses a `Link` header, returning the first target whose `rel` names an
/// llms.txt variant. Targets are resolved against the page URL.
fn parse_llms_link_header(header: &str, base: &Url) -> Option<String> {
    for part in header.split(',') {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_llms = segments.any(|param| {
            let param = param.trim().to_ascii_lowercase();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"'))
                .is_some_and(|rel| {
                    rel.split_whitespace()
                        .any(|r| r == "llms-txt" || r == "llms-full-txt")
                })
        });
        if is_llms {
            return base.join(target).ok().map(|u| u.to_string());
        }
    }
    None
}

/// Candidate documentation URLs, most specific first.
///
/// The `docs.` subdomain is skipped for IP hosts and for hosts already on
/// a docs subdomain.
fn docs_candidates(url: &Url, base: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(DOCS_PATHS.len() + 1);
    if let Some(url::Host::Domain(host)) = url.host() {
        if !host.starts_with("docs.") {
            candidates.push(format!("https://docs.{host}"));
        }
    }
    for docs_path in DOCS_PATHS {
        candidates.push(format!("{base}{docs_path}"));
    }
    candidates
}

/// Scheme + host (+ non-default port), no trailing slash.
fn origin_string(url: &Url) -> String {
    let mut base = format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or_default()
    );
    if let Some(port) = url.port() {
        base.push_str(&format!(":{port}"));
    }
    base
}

fn trim_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}
