use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;

pub(crate) const RATE_LIMIT_MAX_ATTEMPTS: usize = 5;
const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_secs(2);
const RATE_LIMIT_MAX_DELAY: Duration = Duration::from_secs(60);

pub(crate) fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if matches!(status.as_u16(), 429 | 503 | 529) {
        return true;
    }
    let lower = body.to_lowercase();
    ["rate limit", "rate_limit", "too many requests", "quota", "overloaded"]
        .iter()
        .any(|needle| lower.contains(needle))
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Exponential backoff for rate-limited HTTP calls. The delay doubles per
/// attempt up to a cap, and a longer `Retry-After` hint takes precedence.
#[derive(Debug)]
pub(crate) struct Backoff {
    attempt: usize,
    delay: Duration,
}

impl Backoff {
    pub(crate) fn new() -> Self {
        Self {
            attempt: 1,
            delay: RATE_LIMIT_BASE_DELAY,
        }
    }

    pub(crate) fn attempt(&self) -> usize {
        self.attempt
    }

    /// Returns how long to wait before the next attempt, or `None` once the
    /// attempt budget is spent.
    pub(crate) fn next_wait(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.attempt >= RATE_LIMIT_MAX_ATTEMPTS {
            return None;
        }
        self.attempt += 1;
        let wait = retry_after.map_or(self.delay, |hint| hint.max(self.delay));
        self.delay = self.delay.saturating_mul(2).min(RATE_LIMIT_MAX_DELAY);
        Some(wait)
    }
}
