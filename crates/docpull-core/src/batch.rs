//! Batch extraction with bounded concurrency.
//!
//! [`process_batch`] runs up to 50 URLs through the [`Extractor`] with at
//! most 5 extractions in flight at once; both limits come from
//! [`BatchOptions`] and default to [`MAX_BATCH_SIZE`] and
//! [`BATCH_CONCURRENCY`]. Malformed URLs are partitioned out before any
//! network work and reported as immediate failures; every other URL gets an
//! independent outcome, so one failure never cancels or taints its siblings.
//!
//! Results arrive in completion order. Each [`BatchResult`] carries the
//! original submission index, so callers needing input order re-sort by it.

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::analyzer::normalize_input_url;
use crate::extract::{ExtractionResult, Extractor};
use crate::{Error, Result};

/// Maximum URLs accepted per batch.
pub const MAX_BATCH_SIZE: usize = 50;

/// Global cap on concurrent in-flight extractions.
pub const BATCH_CONCURRENCY: usize = 5;

/// Limits for one batch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    /// Maximum URLs accepted per call.
    pub max_batch_size: usize,
    /// Concurrent in-flight extractions. Treated as at least 1.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            concurrency: BATCH_CONCURRENCY,
        }
    }
}

/// Outcome for one submitted URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Position of this URL in the submitted batch.
    pub index: usize,
    /// The URL as submitted.
    pub url: String,
    /// Whether extraction produced content.
    pub success: bool,
    /// Failure explanation, when unsuccessful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Full extraction result for URLs that reached the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractionResult>,
}

/// Aggregate numbers for a completed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    /// URLs submitted.
    pub total: usize,
    /// URLs that produced content.
    pub successful: usize,
    /// URLs that failed, including malformed input.
    pub failed: usize,
    /// Token estimate summed across successful extractions.
    pub total_tokens: usize,
}

/// Results plus aggregate stats for one batch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Per-URL outcomes, in completion order.
    pub results: Vec<BatchResult>,
    /// Aggregates computed after all outcomes are in.
    pub stats: BatchStats,
}

/// Runs a batch of URLs through the extractor.
///
/// Rejects empty and oversized input before any I/O. Invalid URLs fail
/// immediately without consuming a network slot.
#[instrument(skip_all, fields(urls = urls.len()))]
pub async fn process_batch(
    extractor: &Extractor,
    urls: &[String],
    options: &BatchOptions,
) -> Result<BatchReport> {
    if urls.is_empty() {
        return Err(Error::ResourceLimited("batch is empty".to_string()));
    }
    if urls.len() > options.max_batch_size {
        return Err(Error::ResourceLimited(format!(
            "batch size {} exceeds the maximum of {}",
            urls.len(),
            options.max_batch_size
        )));
    }

    let mut results: Vec<BatchResult> = Vec::with_capacity(urls.len());
    let mut jobs = Vec::new();
    for (index, raw) in urls.iter().enumerate() {
        match normalize_input_url(raw) {
            Ok(url) => jobs.push((index, raw.clone(), url.to_string())),
            Err(e) => {
                debug!(url = %raw, error = %e, "Rejecting malformed batch entry");
                results.push(BatchResult {
                    index,
                    url: raw.clone(),
                    success: false,
                    error: Some("Invalid URL format".to_string()),
                    data: None,
                });
            }
        }
    }

    let mut in_flight = stream::iter(jobs.into_iter().map(|(index, raw, url)| async move {
        let outcome = extractor.extract(&url, None).await;
        (index, raw, outcome)
    }))
    .buffer_unordered(options.concurrency.max(1));

    while let Some((index, url, outcome)) = in_flight.next().await {
        results.push(BatchResult {
            index,
            url,
            success: outcome.success,
            error: outcome.error.clone(),
            data: Some(outcome),
        });
    }

    let successful = results.iter().filter(|r| r.success).count();
    let total_tokens = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.data.as_ref())
        .map(|d| d.stats.total_tokens)
        .sum();
    let stats = BatchStats {
        total: urls.len(),
        successful,
        failed: urls.len() - successful,
        total_tokens,
    };
    info!(
        total = stats.total,
        successful = stats.successful,
        failed = stats.failed,
        "Batch complete"
    );

    Ok(BatchReport { results, stats })
}
