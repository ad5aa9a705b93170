//! Runtime configuration.
//!
//! All knobs default to the built-in constants, so an empty TOML document is
//! a valid configuration. Sections may be given partially; unknown keys are
//! rejected to catch typos.
//!
//! ```rust
//! use docpull_core::config::DocpullConfig;
//!
//! let config = DocpullConfig::from_toml_str("[fetch]\ntimeout_secs = 10\n")?;
//! assert_eq!(config.fetch.timeout_secs, 10);
//! assert_eq!(config.batch.max_batch_size, 50);
//! # Ok::<(), docpull_core::Error>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::batch::{BATCH_CONCURRENCY, BatchOptions, MAX_BATCH_SIZE};
use crate::cache::TtlLruCache;
use crate::extract::{ExtractOptions, Extractor};
use crate::fetcher::Fetcher;
use crate::ratelimit::RateLimiter;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocpullConfig {
    /// HTTP client settings.
    pub fetch: FetchConfig,
    /// In-memory cache sizing.
    pub cache: CacheSettings,
    /// Per-identity admission control.
    pub rate_limit: RateLimitSettings,
    /// Batch coordinator limits.
    pub batch: BatchSettings,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Cache TTLs and capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// TTL for extraction results, seconds.
    pub extraction_ttl_secs: u64,
    /// Maximum cached extraction results.
    pub extraction_capacity: usize,
    /// TTL for validation results, seconds.
    pub validation_ttl_secs: u64,
    /// Maximum cached validation results.
    pub validation_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            extraction_ttl_secs: 5 * 60,
            extraction_capacity: 100,
            validation_ttl_secs: 2 * 60,
            validation_capacity: 200,
        }
    }
}

/// Fixed-window rate limiter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSettings {
    /// Requests allowed per identity per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
        }
    }
}

/// Batch coordinator limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Maximum URLs accepted per batch call.
    pub max_batch_size: usize,
    /// Concurrent in-flight extractions.
    pub concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            concurrency: BATCH_CONCURRENCY,
        }
    }
}

impl DocpullConfig {
    /// Parses a TOML document, filling omitted fields with defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Builds an HTTP fetcher from the fetch settings.
    pub fn fetcher(&self) -> Result<Fetcher> {
        Fetcher::with_timeout(Duration::from_secs(self.fetch.timeout_secs))
    }

    /// Builds the extraction-result cache from the cache settings.
    #[must_use]
    pub fn extraction_cache<V: Clone>(&self) -> TtlLruCache<V> {
        TtlLruCache::new(
            self.cache.extraction_capacity,
            Duration::from_secs(self.cache.extraction_ttl_secs),
        )
    }

    /// Builds the validation-result cache from the cache settings.
    #[must_use]
    pub fn validation_cache<V: Clone>(&self) -> TtlLruCache<V> {
        TtlLruCache::new(
            self.cache.validation_capacity,
            Duration::from_secs(self.cache.validation_ttl_secs),
        )
    }

    /// Builds an extractor whose fetch timeout and result-cache sizing come
    /// from this configuration.
    pub fn extractor(&self) -> Result<Extractor> {
        Ok(Extractor::with_cache(
            self.fetcher()?,
            ExtractOptions::default(),
            self.extraction_cache(),
        ))
    }

    /// Builds batch limits from the batch settings.
    #[must_use]
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_batch_size: self.batch.max_batch_size,
            concurrency: self.batch.concurrency,
        }
    }

    /// Builds a rate limiter from the rate-limit settings.
    #[must_use]
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit.max_requests,
            Duration::from_secs(self.rate_limit.window_secs),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() -> anyhow::Result<()> {
        let config = DocpullConfig::from_toml_str("")?;
        assert_eq!(config, DocpullConfig::default());
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.cache.extraction_ttl_secs, 300);
        assert_eq!(config.cache.validation_capacity, 200);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.batch.concurrency, 5);
        Ok(())
    }

    #[test]
    fn partial_sections_keep_other_defaults() -> anyhow::Result<()> {
        let config = DocpullConfig::from_toml_str(
            "[cache]\nextraction_capacity = 10\n\n[rate_limit]\nmax_requests = 3\n",
        )?;
        assert_eq!(config.cache.extraction_capacity, 10);
        assert_eq!(config.cache.extraction_ttl_secs, 300);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DocpullConfig::from_toml_str("[fetch]\ntimeout = 10\n").is_err());
        assert!(DocpullConfig::from_toml_str("[nope]\nx = 1\n").is_err());
    }

    #[test]
    fn batch_options_come_from_settings() -> anyhow::Result<()> {
        let config = DocpullConfig::from_toml_str(
            "[batch]\nmax_batch_size = 8\nconcurrency = 2\n",
        )?;
        let options = config.batch_options();
        assert_eq!(options.max_batch_size, 8);
        assert_eq!(options.concurrency, 2);
        assert!(config.extractor().is_ok());
        Ok(())
    }

    #[test]
    fn round_trips_through_toml() {
        let config = DocpullConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed = DocpullConfig::from_toml_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }
}
