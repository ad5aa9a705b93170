//! Fixed-window rate limiting keyed by client identity.
//!
//! A window opens at the first request from an identity and stays fixed for
//! the configured duration; once the window fully elapses the next request
//! starts a fresh window with a count of one. Denial is data, not an error:
//! callers read [`RateLimitDecision::allowed`] and translate a denial into a
//! 429 with `Retry-After = reset_at - now`.
//!
//! ```rust
//! use std::time::Duration;
//! use docpull_core::ratelimit::RateLimiter;
//!
//! let limiter = RateLimiter::new(3, Duration::from_secs(60));
//! let decision = limiter.check_and_record("203.0.113.7");
//! assert!(decision.allowed);
//! assert_eq!(decision.remaining, 2);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::{debug, trace};

/// Interval between background sweeps of fully-elapsed windows.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Loopback fallback when no forwarding header identifies the client.
const LOOPBACK_IDENTITY: &str = "127.0.0.1";

/// Headers consulted for the client identity, in precedence order.
const IDENTITY_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-vercel-forwarded-for",
    "cf-connecting-ip",
    "x-real-ip",
];

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Requests left in the current window after this decision.
    pub remaining: u32,
    /// Unix timestamp (seconds) when the current window resets.
    pub reset_at: u64,
    /// The configured per-window limit.
    pub limit: u32,
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterStats {
    /// Identities with a window currently tracked.
    pub tracked_identities: usize,
    /// Total admitted requests.
    pub allowed: u64,
    /// Total denied requests.
    pub denied: u64,
}

/// Per-identity window state.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: SystemTime,
}

#[derive(Debug, Default)]
struct LimiterInner {
    windows: HashMap<String, WindowEntry>,
    allowed: u64,
    denied: u64,
}

/// Sliding admission control with one fixed window per client identity.
#[derive(Debug)]
pub struct RateLimiter {
    inner: Mutex<LimiterInner>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_requests` per `window` per identity.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(LimiterInner::default()),
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Read-only admission check: reports what [`check_and_record`] would
    /// decide without consuming a slot.
    ///
    /// [`check_and_record`]: Self::check_and_record
    pub fn check(&self, identity: &str) -> RateLimitDecision {
        self.check_at(identity, SystemTime::now())
    }

    /// Clock-injectable variant of [`check`](Self::check).
    pub fn check_at(&self, identity: &str, now: SystemTime) -> RateLimitDecision {
        let Ok(inner) = self.inner.lock() else {
            return self.fresh_decision(now);
        };
        match inner.windows.get(identity) {
            Some(entry) if !self.window_elapsed(entry, now) => {
                let allowed = entry.count < self.max_requests;
                RateLimitDecision {
                    allowed,
                    remaining: if allowed {
                        self.max_requests - entry.count - 1
                    } else {
                        0
                    },
                    reset_at: unix_seconds(entry.window_start + self.window),
                    limit: self.max_requests,
                }
            }
            _ => self.fresh_decision(now),
        }
    }

    /// Records a request without deciding admission. Starts a new window when
    /// none exists or the previous one has fully elapsed.
    pub fn record(&self, identity: &str) {
        self.record_at(identity, SystemTime::now());
    }

    /// Clock-injectable variant of [`record`](Self::record).
    pub fn record_at(&self, identity: &str, now: SystemTime) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let elapsed = inner
            .windows
            .get(identity)
            .is_none_or(|e| self.window_elapsed(e, now));
        if elapsed {
            inner.windows.insert(
                identity.to_string(),
                WindowEntry {
                    count: 1,
                    window_start: now,
                },
            );
        } else if let Some(entry) = inner.windows.get_mut(identity) {
            entry.count = entry.count.saturating_add(1);
        }
    }

    /// Checks admission and, if admitted, records the request atomically.
    pub fn check_and_record(&self, identity: &str) -> RateLimitDecision {
        self.check_and_record_at(identity, SystemTime::now())
    }

    /// Clock-injectable variant of [`check_and_record`](Self::check_and_record).
    pub fn check_and_record_at(&self, identity: &str, now: SystemTime) -> RateLimitDecision {
        let Ok(mut inner) = self.inner.lock() else {
            return self.fresh_decision(now);
        };

        let elapsed = inner
            .windows
            .get(identity)
            .is_none_or(|e| self.window_elapsed(e, now));

        if elapsed {
            inner.windows.insert(
                identity.to_string(),
                WindowEntry {
                    count: 1,
                    window_start: now,
                },
            );
            inner.allowed += 1;
            trace!(identity = %identity, "Opened new rate limit window");
            return RateLimitDecision {
                allowed: true,
                remaining: self.max_requests - 1,
                reset_at: unix_seconds(now + self.window),
                limit: self.max_requests,
            };
        }

        // Window still open: admit until the limit is reached.
        let max = self.max_requests;
        let Some(entry) = inner.windows.get_mut(identity) else {
            return self.fresh_decision(now);
        };
        let reset_at = unix_seconds(entry.window_start + self.window);

        if entry.count >= max {
            inner.denied += 1;
            debug!(identity = %identity, limit = max, "Rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
                limit: max,
            };
        }

        entry.count += 1;
        let remaining = max - entry.count;
        inner.allowed += 1;
        RateLimitDecision {
            allowed: true,
            remaining,
            reset_at,
            limit: max,
        }
    }

    /// Forgets the window for one identity.
    pub fn reset(&self, identity: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.windows.remove(identity);
        }
    }

    /// Forgets every tracked window.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.windows.clear();
        }
    }

    /// Evicts identities whose window has fully elapsed, returning how many
    /// were removed. The background sweeper calls this every five minutes.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(SystemTime::now())
    }

    /// Clock-injectable variant of [`cleanup`](Self::cleanup).
    pub fn cleanup_at(&self, now: SystemTime) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        let before = inner.windows.len();
        let window = self.window;
        inner
            .windows
            .retain(|_, e| now.duration_since(e.window_start).unwrap_or_default() < window);
        before - inner.windows.len()
    }

    /// Current counters.
    pub fn stats(&self) -> RateLimiterStats {
        self.inner
            .lock()
            .map(|inner| RateLimiterStats {
                tracked_identities: inner.windows.len(),
                allowed: inner.allowed,
                denied: inner.denied,
            })
            .unwrap_or_default()
    }

    /// Spawns the five-minute background sweep on the current tokio runtime.
    ///
    /// The returned guard cancels the task when dropped or via
    /// [`SweeperGuard::destroy`].
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperGuard {
        let limiter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let removed = limiter.cleanup();
                if removed > 0 {
                    debug!(removed, "Swept elapsed rate limit windows");
                }
            }
        });
        SweeperGuard {
            handle: Some(handle),
        }
    }

    fn window_elapsed(&self, entry: &WindowEntry, now: SystemTime) -> bool {
        now.duration_since(entry.window_start)
            .is_ok_and(|age| age >= self.window)
    }

    fn fresh_decision(&self, now: SystemTime) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - 1,
            reset_at: unix_seconds(now + self.window),
            limit: self.max_requests,
        }
    }
}

/// Handle for the background sweep task.
#[derive(Debug)]
pub struct SweeperGuard {
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl SweeperGuard {
    /// Cancels the sweep task.
    pub fn destroy(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Extracts the client identity from inbound request headers.
///
/// Precedence: `x-forwarded-for` (first comma-separated value) →
/// `x-vercel-forwarded-for` → `cf-connecting-ip` → `x-real-ip` → loopback.
/// This order is part of the external contract for network deployments.
#[must_use]
pub fn client_identity(headers: &HeaderMap) -> String {
    for name in IDENTITY_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    LOOPBACK_IDENTITY.to_string()
}

/// Response headers advertising the limiter state.
///
/// Always includes `X-RateLimit-Limit`, `X-RateLimit-Remaining`, and
/// `X-RateLimit-Reset`; on denial also `Retry-After` computed against `now`.
#[must_use]
pub fn rate_limit_headers(decision: &RateLimitDecision) -> Vec<(&'static str, String)> {
    rate_limit_headers_at(decision, SystemTime::now())
}

/// Clock-injectable variant of [`rate_limit_headers`].
#[must_use]
pub fn rate_limit_headers_at(
    decision: &RateLimitDecision,
    now: SystemTime,
) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("X-RateLimit-Limit", decision.limit.to_string()),
        ("X-RateLimit-Remaining", decision.remaining.to_string()),
        ("X-RateLimit-Reset", decision.reset_at.to_string()),
    ];
    if !decision.allowed {
        let retry_after = decision.reset_at.saturating_sub(unix_seconds(now));
        headers.push(("Retry-After", retry_after.to_string()));
    }
    headers
}

fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
