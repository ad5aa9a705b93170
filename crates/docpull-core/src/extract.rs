//! Extraction orchestration.
//!
//! [`Extractor::extract`] runs the full pipeline for one URL: analyze the
//! host, execute the chosen strategy, and synthesize the combined artifacts
//! (full document with a table of contents, agent prompt, MCP config,
//! stats). It never returns an error to its caller: any failure is folded
//! into a well-formed [`ExtractionResult`] with `success == false` and a
//! descriptive error string, which is what lets the batch coordinator treat
//! every URL identically.
//!
//! Progress is reported through an optional callback with monotonically
//! increasing percentages across the `Analyzing → Fetching → Processing →
//! Complete` phases; failures emit a final `Error` phase.
//!
//! ```rust,no_run
//! use docpull_core::extract::Extractor;
//! use docpull_core::fetcher::Fetcher;
//!
//! # async fn run() -> docpull_core::Result<()> {
//! let extractor = Extractor::new(Fetcher::new()?);
//! let result = extractor.extract("https://example.com", None).await;
//! if result.success {
//!     println!("{} documents", result.documents.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::analyzer::{Strategy, UrlAnalysis, analyze_url};
use crate::cache::{CacheStats, TtlLruCache};
use crate::convert::{MarkdownDocument, scrape_page};
use crate::fetcher::Fetcher;
use crate::filter::sort_by_docs_priority;
use crate::sitemap;
use crate::{Error, Result};

/// Pipeline phase reported through progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressPhase {
    /// Probing the host for a strategy.
    Analyzing,
    /// Fetching pages or the llms.txt file.
    Fetching,
    /// Assembling documents and companion artifacts.
    Processing,
    /// Extraction finished.
    Complete,
    /// Extraction failed; the result still carries details.
    Error,
}

/// One progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Current phase.
    pub phase: ProgressPhase,
    /// Overall completion, 0-100, never decreasing within one extraction.
    pub percent: u8,
    /// Human-readable status line.
    pub message: String,
}

/// Progress callback. Invoked inline on the extraction task.
pub type ProgressCallback<'a> = &'a (dyn Fn(&ProgressUpdate) + Send + Sync);

/// Tuning knobs for one extractor instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// Upper bound on pages scraped per extraction. Defaults to the sitemap
    /// collection ceiling, so by default every collected page is fetched.
    pub max_pages: usize,
    /// Whether the in-memory result cache is consulted and filled.
    pub cache_results: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_pages: sitemap::DEFAULT_MAX_URLS,
            cache_results: true,
        }
    }
}

/// Where the content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    /// Normalized input URL.
    pub url: String,
    /// The resource the content was actually read from (llms.txt, sitemap,
    /// or discovered docs page).
    pub source_url: String,
    /// Site or document title.
    pub title: String,
    /// Host name of the site.
    pub site_name: String,
}

/// Aggregate numbers for one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    /// Number of documents produced.
    pub total_documents: usize,
    /// Whitespace-separated words across all documents.
    pub total_words: usize,
    /// Characters across all documents.
    pub total_characters: usize,
    /// Rough token estimate (characters / 4).
    pub total_tokens: usize,
    /// Wall-clock extraction time in milliseconds.
    pub extraction_time_ms: u64,
}

/// One addressable resource inside the produced documentation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpResource {
    /// Section name.
    pub name: String,
    /// Anchor URI into the full document.
    pub uri: String,
}

/// Machine-readable description of the extraction output, suitable for
/// registering the documentation set with an MCP host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConfig {
    /// Set name, derived from the site.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// The resource the content was read from.
    pub source_url: String,
    /// Strategy that produced the set.
    pub strategy: Strategy,
    /// Per-section resources.
    pub resources: Vec<McpResource>,
}

/// Complete outcome of one extraction. Always well-formed; `success == false`
/// only when no content could be produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Whether any content was produced.
    pub success: bool,
    /// Strategy chosen by analysis.
    pub strategy: Strategy,
    /// Content provenance.
    pub source: SourceInfo,
    /// Per-page / per-section documents.
    pub documents: Vec<MarkdownDocument>,
    /// Concatenated document with a table of contents.
    pub full_document: String,
    /// Usage guide addressed to an AI agent consuming the set.
    pub agent_prompt: String,
    /// Machine-readable output descriptor.
    pub mcp_config: McpConfig,
    /// Aggregate numbers.
    pub stats: ExtractionStats,
    /// Failure explanation, present only when `success == false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Monotone progress reporter; percentages never go backwards.
struct ProgressEmitter<'a> {
    callback: Option<ProgressCallback<'a>>,
    last: AtomicU8,
}

impl<'a> ProgressEmitter<'a> {
    fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self {
            callback,
            last: AtomicU8::new(0),
        }
    }

    fn emit(&self, phase: ProgressPhase, percent: u8, message: impl Into<String>) {
        let previous = self.last.fetch_max(percent, Ordering::Relaxed);
        if let Some(callback) = self.callback {
            callback(&ProgressUpdate {
                phase,
                percent: previous.max(percent),
                message: message.into(),
            });
        }
    }
}

/// Runs extractions, caching successful results in memory.
pub struct Extractor {
    fetcher: Fetcher,
    cache: TtlLruCache<ExtractionResult>,
    options: ExtractOptions,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Creates an extractor with default options and an extraction cache.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_options(fetcher, ExtractOptions::default())
    }

    /// Creates an extractor with explicit options.
    #[must_use]
    pub fn with_options(fetcher: Fetcher, options: ExtractOptions) -> Self {
        Self::with_cache(fetcher, options, TtlLruCache::for_extractions())
    }

    /// Creates an extractor with an injected result cache, for callers that
    /// size the cache themselves (see [`DocpullConfig::extraction_cache`]).
    ///
    /// [`DocpullConfig::extraction_cache`]: crate::config::DocpullConfig::extraction_cache
    #[must_use]
    pub fn with_cache(
        fetcher: Fetcher,
        options: ExtractOptions,
        cache: TtlLruCache<ExtractionResult>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            options,
        }
    }

    /// Cache hit/miss/eviction counters for this extractor.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Extracts documentation for one URL.
    ///
    /// Never returns an error: failures come back as a result with
    /// `success == false` and an `error` string.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(
        &self,
        url: &str,
        progress: Option<ProgressCallback<'_>>,
    ) -> ExtractionResult {
        let started = Instant::now();
        let emitter = ProgressEmitter::new(progress);

        if self.options.cache_results {
            if let Some(cached) = self.cache.get(url) {
                debug!("Returning cached extraction");
                emitter.emit(ProgressPhase::Complete, 100, "Served from cache");
                return cached;
            }
        }

        match self.run_pipeline(url, &emitter).await {
            Ok(mut result) => {
                result.stats.extraction_time_ms = elapsed_ms(started);
                if result.success {
                    emitter.emit(ProgressPhase::Complete, 100, "Extraction complete");
                    if self.options.cache_results {
                        self.cache.set(url, result.clone());
                    }
                } else {
                    emitter.emit(
                        ProgressPhase::Error,
                        100,
                        result.error.clone().unwrap_or_default(),
                    );
                }
                result
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Extraction failed");
                emitter.emit(ProgressPhase::Error, 100, message.clone());
                failed_result(url, Strategy::Unknown, message, elapsed_ms(started))
            }
        }
    }

    /// Analysis, strategy execution, and synthesis. Errors bubbling out of
    /// here are converted to a failed result by `extract`.
    async fn run_pipeline(
        &self,
        url: &str,
        emitter: &ProgressEmitter<'_>,
    ) -> Result<ExtractionResult> {
        emitter.emit(ProgressPhase::Analyzing, 0, format!("Analyzing {url}"));
        let analysis = analyze_url(&self.fetcher, url).await?;
        emitter.emit(
            ProgressPhase::Analyzing,
            10,
            format!("Strategy: {}", analysis.strategy),
        );

        let (documents, source_url) = self.run_strategy(&analysis, emitter).await?;

        emitter.emit(ProgressPhase::Processing, 85, "Assembling documents");
        Ok(synthesize(&analysis, documents, source_url))
    }

    /// Executes the analyzed strategy, returning the documents and the URL
    /// the content was read from.
    async fn run_strategy(
        &self,
        analysis: &UrlAnalysis,
        emitter: &ProgressEmitter<'_>,
    ) -> Result<(Vec<MarkdownDocument>, String)> {
        match analysis.strategy {
            Strategy::LlmsTxt => {
                let llms_url = analysis
                    .llms_txt_url
                    .clone()
                    .ok_or_else(|| Error::NotFound("llms.txt location missing".to_string()))?;
                emitter.emit(ProgressPhase::Fetching, 20, format!("Fetching {llms_url}"));
                let text = self.fetcher.fetch(&llms_url).await?;
                let documents = split_llms_sections(&text, &llms_url);
                Ok((documents, llms_url))
            }
            Strategy::Sitemap => {
                let mut pages = analysis.pages.clone();
                sort_by_docs_priority(&mut pages);
                pages.truncate(self.options.max_pages);
                let documents = self.scrape_pages(&pages, emitter).await;
                let source_url = analysis
                    .sitemap_url
                    .clone()
                    .unwrap_or_else(|| analysis.original_url.clone());
                Ok((documents, source_url))
            }
            Strategy::DocsDiscovery => {
                let docs_url = analysis
                    .docs_url
                    .clone()
                    .ok_or_else(|| Error::NotFound("docs location missing".to_string()))?;
                // One re-analysis of the discovered page; if that also lands
                // on a direct scrape, scrape the discovered page itself.
                let second = analyze_url(&self.fetcher, &docs_url).await?;
                match second.strategy {
                    Strategy::LlmsTxt | Strategy::Sitemap => {
                        let (documents, _) = Box::pin(self.run_strategy(&second, emitter)).await?;
                        Ok((documents, docs_url))
                    }
                    _ => {
                        let documents = self.scrape_pages(&[docs_url.clone()], emitter).await;
                        Ok((documents, docs_url))
                    }
                }
            }
            Strategy::HtmlScrape | Strategy::Unknown => {
                let pages = if analysis.pages.is_empty() {
                    vec![analysis.original_url.clone()]
                } else {
                    analysis.pages.clone()
                };
                let documents = self.scrape_pages(&pages, emitter).await;
                Ok((documents, analysis.original_url.clone()))
            }
        }
    }

    /// Scrapes pages sequentially, skipping per-page failures.
    async fn scrape_pages(
        &self,
        pages: &[String],
        emitter: &ProgressEmitter<'_>,
    ) -> Vec<MarkdownDocument> {
        let total = pages.len().max(1);
        let mut documents = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let percent = 10 + ((i + 1) * 70 / total) as u8;
            emitter.emit(ProgressPhase::Fetching, percent, format!("Fetching {page}"));
            match scrape_page(&self.fetcher, page).await {
                Ok(doc) if !doc.content.trim().is_empty() => documents.push(doc),
                Ok(_) => debug!(url = %page, "Page produced no content, skipping"),
                Err(e) => warn!(url = %page, error = %e, "Page failed, skipping"),
            }
        }
        documents
    }
}

/// Splits an llms.txt body into one document per `##` section.
///
/// A file without `##` headings becomes a single document. Text before the
/// first section heading is not emitted as a document; its top-level `#`
/// heading, when present, is used for the set title downstream.
fn split_llms_sections(text: &str, source_url: &str) -> Vec<MarkdownDocument> {
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some((heading.trim().to_string(), format!("{line}\n")));
        } else if let Some((_, body)) = current.as_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }

    if sections.is_empty() {
        let title = leading_h1(text).unwrap_or_else(|| "Documentation".to_string());
        return vec![MarkdownDocument::new(
            title,
            source_url.to_string(),
            text.trim().to_string(),
            None,
        )];
    }

    sections
        .into_iter()
        .map(|(title, body)| {
            MarkdownDocument::new(title, source_url.to_string(), body.trim().to_string(), None)
        })
        .collect()
}

/// First `# ` heading of a markdown body.
fn leading_h1(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        line.strip_prefix("# ")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
    })
}

/// Builds the final result from the produced documents.
fn synthesize(
    analysis: &UrlAnalysis,
    documents: Vec<MarkdownDocument>,
    source_url: String,
) -> ExtractionResult {
    let site_name = host_of(&analysis.original_url);

    if documents.is_empty() {
        let mut result = failed_result(
            &analysis.original_url,
            analysis.strategy,
            format!(
                "No documentation content could be extracted from {}",
                analysis.original_url
            ),
            0,
        );
        result.source.source_url = source_url;
        return result;
    }

    let title = documents
        .first()
        .map(|d| d.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| site_name.clone());

    let full_document = build_full_document(&title, &documents);
    let agent_prompt = build_agent_prompt(&title, &site_name, &source_url, &documents);
    let mcp_config = build_mcp_config(&title, &site_name, &source_url, analysis.strategy, &documents);

    let total_words: usize = documents.iter().map(|d| d.word_count).sum();
    let total_characters: usize = documents.iter().map(|d| d.content.len()).sum();
    let stats = ExtractionStats {
        total_documents: documents.len(),
        total_words,
        total_characters,
        total_tokens: total_characters / 4,
        extraction_time_ms: 0,
    };

    ExtractionResult {
        success: true,
        strategy: analysis.strategy,
        source: SourceInfo {
            url: analysis.original_url.clone(),
            source_url,
            title,
            site_name,
        },
        documents,
        full_document,
        agent_prompt,
        mcp_config,
        stats,
        error: None,
    }
}

/// Concatenates documents under a table of contents with slugified anchors.
fn build_full_document(title: &str, documents: &[MarkdownDocument]) -> String {
    let mut out = format!("# {title}\n\n## Table of Contents\n\n");
    for doc in documents {
        out.push_str(&format!("- [{}](#{})\n", doc.title, slugify(&doc.title)));
    }
    out.push_str("\n---\n\n");

    let sections: Vec<String> = documents
        .iter()
        .map(|doc| {
            if doc.content.starts_with("## ") {
                doc.content.clone()
            } else {
                format!("## {}\n\n{}", doc.title, doc.content)
            }
        })
        .collect();
    out.push_str(&sections.join("\n\n---\n\n"));
    out.push('\n');
    out
}

/// A short usage guide addressed to an agent consuming the set.
fn build_agent_prompt(
    title: &str,
    site_name: &str,
    source_url: &str,
    documents: &[MarkdownDocument],
) -> String {
    let mut prompt = format!(
        "This is the extracted documentation for {title} ({site_name}), \
         read from {source_url}.\n\nIt contains {} section(s):\n",
        documents.len()
    );
    for doc in documents {
        prompt.push_str(&format!("- {} ({} words)\n", doc.title, doc.word_count));
    }
    prompt.push_str(
        "\nUse the table of contents anchors in the full document to jump to a \
         section. Prefer quoting code blocks verbatim; they are fenced with \
         their source language where known.\n",
    );
    prompt
}

fn build_mcp_config(
    title: &str,
    site_name: &str,
    source_url: &str,
    strategy: Strategy,
    documents: &[MarkdownDocument],
) -> McpConfig {
    let resources = documents
        .iter()
        .map(|doc| McpResource {
            name: doc.title.clone(),
            uri: format!("doc://{site_name}/#{}", slugify(&doc.title)),
        })
        .collect();
    McpConfig {
        name: slugify(title),
        description: format!("Documentation for {title}, extracted from {source_url}"),
        source_url: source_url.to_string(),
        strategy,
        resources,
    }
}

/// A well-formed failure result.
fn failed_result(
    url: &str,
    strategy: Strategy,
    error: String,
    extraction_time_ms: u64,
) -> ExtractionResult {
    let site_name = host_of(url);
    ExtractionResult {
        success: false,
        strategy,
        source: SourceInfo {
            url: url.to_string(),
            source_url: url.to_string(),
            title: String::new(),
            site_name,
        },
        documents: Vec::new(),
        full_document: String::new(),
        agent_prompt: String::new(),
        mcp_config: McpConfig {
            name: String::new(),
            description: String::new(),
            source_url: url.to_string(),
            strategy,
            resources: Vec::new(),
        },
        stats: ExtractionStats {
            extraction_time_ms,
            ..ExtractionStats::default()
        },
        error: Some(error),
    }
}

/// Lowercased GitHub-style anchor slug for a heading.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_default()
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
