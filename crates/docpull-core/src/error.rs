//! Error types and handling for docpull-core operations.
//!
//! The error taxonomy follows the extraction pipeline's recovery contract:
//!
//! - **Input errors** (`InvalidUrl`, `ResourceLimited`) are rejected before
//!   any I/O happens.
//! - **Network errors** (`Network`, `NotFound`, `Timeout`) are caught at the
//!   smallest scope — one probe, one page, one sitemap — and converted into
//!   "try the next strategy" / "skip this page" by the caller.
//! - **No-content** is never an `Error` at all: the orchestrator surfaces it
//!   as a well-formed result with `success = false`.
//!
//! Errors carry a recoverability hint for callers that want retry logic:
//!
//! ```rust
//! use docpull_core::Error;
//!
//! let err = Error::Timeout("fetch exceeded 30s".to_string());
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "timeout");
//! ```

use thiserror::Error;

/// The main error type for docpull-core operations.
///
/// All public fallible functions return `Result<T, Error>`. Conversions from
/// common library errors are provided so `?` works throughout the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed (config file reads, primarily).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed. Wraps the underlying `reqwest::Error` so
    /// connection detail (timeout vs refused vs TLS) is preserved.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Parsing failed: malformed sitemap XML, unparseable llms.txt structure.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote resource answered with a non-success status.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A bound was exceeded: oversized batch, sitemap recursion depth,
    /// collected-URL ceiling.
    #[error("Resource limited: {0}")]
    ResourceLimited(String),

    /// Operation exceeded its configured timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Whether a retry after a delay might succeed.
    ///
    /// Network interruptions and timeouts are usually transient; parse
    /// failures, invalid input, and exceeded bounds are permanent.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Stable category label for logging and metrics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::InvalidUrl(_) => "invalid_url",
            Self::ResourceLimited(_) => "resource_limited",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result type alias for docpull-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_recoverable() {
        assert!(Error::Timeout("slow".to_string()).is_recoverable());
    }

    #[test]
    fn input_errors_are_permanent() {
        assert!(!Error::InvalidUrl("nope".to_string()).is_recoverable());
        assert!(!Error::ResourceLimited("too many".to_string()).is_recoverable());
        assert!(!Error::Parse("bad xml".to_string()).is_recoverable());
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(Error::Parse(String::new()).category(), "parse");
        assert_eq!(Error::NotFound(String::new()).category(), "not_found");
        assert_eq!(
            Error::ResourceLimited(String::new()).category(),
            "resource_limited"
        );
    }

    #[test]
    fn url_parse_error_converts() {
        let err: Error = url::ParseError::EmptyHost.into();
        assert_eq!(err.category(), "invalid_url");
    }
}
