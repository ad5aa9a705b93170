//! # docpull-core
//!
//! Documentation extraction engine: turns arbitrary website URLs into clean
//! Markdown suitable for LLM consumption.
//!
//! Given a URL, the engine probes the host for the cheapest viable source
//! (an llms.txt file, a sitemap, a discovered docs path, or the page itself),
//! extracts the content, and assembles a combined document with a table of
//! contents plus companion artifacts (agent prompt, MCP config, stats). The
//! infrastructure around it (TTL+LRU caching, fixed-window rate limiting,
//! bounded batch concurrency) makes many extractions safe to run against
//! arbitrary third-party servers at once.
//!
//! ## Architecture
//!
//! - **Analysis**: [`analyzer`] assigns exactly one extraction strategy per
//!   URL, with direct HTML scraping as the guaranteed fallback
//! - **Extraction**: [`extract`] executes the strategy and synthesizes the
//!   final result; it never raises, folding failures into the result
//! - **Conversion**: [`convert`] renders HTML to Markdown with best-effort
//!   pattern matching behind a stable interface
//! - **Infrastructure**: [`cache`], [`ratelimit`], and [`batch`] bound the
//!   memory, request rate, and concurrency of the whole pipeline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docpull_core::{Extractor, Fetcher};
//!
//! # async fn run() -> docpull_core::Result<()> {
//! let extractor = Extractor::new(Fetcher::new()?);
//! let result = extractor.extract("https://example.com/docs", None).await;
//!
//! if result.success {
//!     println!("{} documents via {}", result.documents.len(), result.strategy);
//!     println!("{}", result.full_document);
//! } else {
//!     eprintln!("{}", result.error.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`]. The extraction pipeline
//! itself recovers internally: probe failures move to the next strategy,
//! page failures skip that page, and only a fully-empty outcome surfaces as
//! `success == false` on the [`extract::ExtractionResult`].

/// Strategy selection: llms.txt, sitemap, docs discovery, or page scrape
pub mod analyzer;
/// Bounded-concurrency batch extraction
pub mod batch;
/// In-memory TTL + LRU cache with normalized URL keys
pub mod cache;
/// Runtime configuration loading and defaults
pub mod config;
/// Best-effort HTML to Markdown conversion
pub mod convert;
/// Error types and result alias
pub mod error;
/// Extraction orchestration and result synthesis
pub mod extract;
/// HTTP fetching
pub mod fetcher;
/// Documentation URL filtering and priority ordering
pub mod filter;
/// Fixed-window per-identity rate limiting
pub mod ratelimit;
/// Sitemap parsing and bounded recursive resolution
pub mod sitemap;

// Re-export commonly used types
pub use analyzer::{Strategy, UrlAnalysis, analyze_url, normalize_input_url};
pub use batch::{BatchOptions, BatchReport, BatchResult, BatchStats, process_batch};
pub use cache::{CacheStats, TtlLruCache};
pub use config::DocpullConfig;
pub use convert::{MarkdownDocument, html_to_markdown, scrape_page};
pub use error::{Error, Result};
pub use extract::{
    ExtractOptions, ExtractionResult, ExtractionStats, Extractor, ProgressPhase, ProgressUpdate,
};
pub use fetcher::Fetcher;
pub use ratelimit::{RateLimitDecision, RateLimiter, client_identity};
pub use sitemap::{SitemapEntry, SitemapOptions, fetch_sitemap, parse_sitemap_xml};
