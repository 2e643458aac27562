//! Credential pool / rate governor.
//!
//! Generalizes `hallucinator-core/src/rate_limit.rs`'s `AdaptiveDbLimiter`
//! (one ArcSwap-held governor limiter per remote database, adaptive
//! slowdown on 429) from a single limiter to a round-robin pool of
//! [`Credential`]s, each tracking its own quota parsed from response
//! headers — the shape the design doc's `GovernorState` calls for.
//!
//! The rotation walk is a single bounded pass over the pool (the
//! `rotation-walk` redesign flag in spec.md 9), never an unbounded
//! cursor chase.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::GovernorError;
use crate::transport::Response;
use crate::types::Credential;

/// What the caller should do after [`Governor::report_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Retry,
    Abort,
}

const SAFETY_MARGIN_SECS: i64 = 5;
const ABUSE_PENALTY_SECS: u64 = 60;

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct Governor {
    credentials: Mutex<Vec<Credential>>,
    cursor: AtomicUsize,
    threshold: i64,
}

impl Governor {
    pub fn new(credentials: Vec<Credential>, threshold: i64) -> Self {
        Self {
            credentials: Mutex::new(credentials),
            cursor: AtomicUsize::new(0),
            threshold,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.lock().unwrap().is_empty()
    }

    /// Return a credential safe to use immediately. Blocks (sleeps) as
    /// needed: honoring a per-credential `Retry-After`, or waiting out the
    /// minimum reset time across the pool if every credential is below
    /// threshold.
    pub async fn acquire(&self) -> Result<Credential, GovernorError> {
        loop {
            if let Some(cred) = self.try_select() {
                return Ok(cred);
            }

            let wait = self.wait_duration()?;
            log::warn!("credential pool exhausted, waiting {wait:?} for reset");
            tokio::time::sleep(wait).await;
            self.refresh_after_wait();
        }
    }

    /// One bounded pass over the pool starting at the cursor. Returns the
    /// first usable credential and advances the cursor to it.
    fn try_select(&self) -> Option<Credential> {
        let mut creds = self.credentials.lock().unwrap();
        let len = creds.len();
        if len == 0 {
            return None;
        }
        let start = self.cursor.load(Ordering::SeqCst) % len;
        let now = now_epoch();

        for offset in 0..len {
            let idx = (start + offset) % len;
            let cred = &mut creds[idx];
            if !cred.valid {
                continue;
            }
            if cred.remaining <= self.threshold {
                continue;
            }
            if let Some(retry_after) = cred.retry_after {
                if retry_after > now {
                    continue;
                }
                cred.retry_after = None;
            }
            self.cursor.store(idx, Ordering::SeqCst);
            return Some(cred.clone());
        }
        None
    }

    fn wait_duration(&self) -> Result<Duration, GovernorError> {
        let creds = self.credentials.lock().unwrap();
        if creds.is_empty() {
            return Err(GovernorError::Empty);
        }
        let valid_resets: Vec<i64> = creds.iter().filter(|c| c.valid).map(|c| c.reset_epoch).collect();
        if valid_resets.is_empty() {
            return Err(GovernorError::PoolExhausted);
        }
        let min_reset = *valid_resets.iter().min().unwrap();
        let now = now_epoch();
        let secs = (min_reset - now + SAFETY_MARGIN_SECS).max(0);
        Ok(Duration::from_secs(secs as u64))
    }

    /// After waking from the global wait, reset each credential's quota
    /// from its last-known limit (refreshed from `X-RateLimit-Limit` when
    /// available, per the open question in spec.md 9).
    fn refresh_after_wait(&self) {
        let mut creds = self.credentials.lock().unwrap();
        for cred in creds.iter_mut() {
            if cred.valid {
                cred.remaining = cred.limit;
            }
        }
    }

    /// Parse rate-limit headers from a response and update the matching
    /// credential in place.
    pub fn observe(&self, secret: &str, response: &Response) {
        let mut creds = self.credentials.lock().unwrap();
        let Some(cred) = creds.iter_mut().find(|c| c.secret() == secret) else {
            return;
        };

        if let Some(v) = response.header("x-ratelimit-remaining").and_then(|v| v.parse().ok()) {
            cred.remaining = v;
        }
        if let Some(v) = response.header("x-ratelimit-limit").and_then(|v| v.parse().ok()) {
            cred.limit = v;
        }
        if let Some(v) = response.header("x-ratelimit-reset").and_then(|v| v.parse().ok()) {
            cred.reset_epoch = v;
        }
        if let Some(v) = response.header("x-ratelimit-resource") {
            cred.resource = v.to_string();
        }
        cred.retry_after = response
            .header("retry-after")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|secs| now_epoch() + secs);

        if cred.remaining < 0 {
            cred.remaining = 0;
        }
    }

    /// Handle a 403/429/401 response body. Mutates the matching credential
    /// (marks it invalid, applies the abuse penalty, or schedules a
    /// `Retry-After`) and returns whether the caller should retry.
    pub async fn report_error(&self, secret: &str, status: u16, body_lower: &str) -> Directive {
        if status == 401 {
            let mut creds = self.credentials.lock().unwrap();
            if let Some(cred) = creds.iter_mut().find(|c| c.secret() == secret) {
                cred.valid = false;
                log::error!("credential {} is invalid (401), dropping from rotation", cred.masked());
            }
            drop(creds);
            return if self.is_empty() || !self.has_valid() {
                Directive::Abort
            } else {
                Directive::Retry
            };
        }

        if status == 403 || status == 429 {
            if body_lower.contains("abuse") || body_lower.contains("secondary") {
                log::warn!("secondary rate limit triggered, sleeping {ABUSE_PENALTY_SECS}s");
                tokio::time::sleep(Duration::from_secs(ABUSE_PENALTY_SECS)).await;
                self.force_rotate(secret);
                return Directive::Retry;
            }
            if body_lower.contains("rate limit") {
                log::warn!("primary rate limit hit, rotating credential");
                self.force_exhaust(secret);
                return Directive::Retry;
            }
        }

        Directive::Retry
    }

    fn has_valid(&self) -> bool {
        self.credentials.lock().unwrap().iter().any(|c| c.valid)
    }

    fn force_exhaust(&self, secret: &str) {
        let mut creds = self.credentials.lock().unwrap();
        if let Some(cred) = creds.iter_mut().find(|c| c.secret() == secret) {
            cred.remaining = 0;
        }
    }

    fn force_rotate(&self, secret: &str) {
        let creds = self.credentials.lock().unwrap();
        if let Some(idx) = creds.iter().position(|c| c.secret() == secret) {
            let len = creds.len();
            self.cursor.store((idx + 1) % len.max(1), Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn resp_with_headers(pairs: &[(&str, &str)]) -> Response {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.insert(
                reqwest::header::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                reqwest::header::HeaderValue::from_str(v).unwrap(),
            );
        }
        Response {
            status: reqwest::StatusCode::OK,
            headers,
            body: bytes::Bytes::new(),
        }
    }

    #[tokio::test]
    async fn acquire_returns_first_usable_credential() {
        let gov = Governor::new(vec![Credential::new("tok-a")], 2);
        let cred = gov.acquire().await.unwrap();
        assert_eq!(cred.secret(), "tok-a");
    }

    #[tokio::test]
    async fn acquire_rotates_when_below_threshold() {
        let mut a = Credential::new("tok-a");
        a.remaining = 1;
        let b = Credential::new("tok-b");
        let gov = Governor::new(vec![a, b], 2);
        let cred = gov.acquire().await.unwrap();
        assert_eq!(cred.secret(), "tok-b");
    }

    #[tokio::test]
    async fn empty_pool_errors_before_any_network_io() {
        let gov = Governor::new(vec![], 2);
        assert!(gov.acquire().await.is_err());
    }

    #[test]
    fn observe_updates_matching_credential_quota() {
        let gov = Governor::new(vec![Credential::new("tok-a")], 2);
        let resp = resp_with_headers(&[
            ("x-ratelimit-remaining", "5"),
            ("x-ratelimit-limit", "30"),
            ("x-ratelimit-reset", "9999999999"),
            ("x-ratelimit-resource", "search"),
        ]);
        gov.observe("tok-a", &resp);
        let creds = gov.credentials.lock().unwrap();
        assert_eq!(creds[0].remaining, 5);
        assert_eq!(creds[0].resource, "search");
    }

    #[test]
    fn observe_never_drives_remaining_negative() {
        let gov = Governor::new(vec![Credential::new("tok-a")], 2);
        let resp = resp_with_headers(&[("x-ratelimit-remaining", "-3")]);
        gov.observe("tok-a", &resp);
        let creds = gov.credentials.lock().unwrap();
        assert!(creds[0].remaining >= 0);
    }

    #[test]
    fn retry_after_is_honored_on_next_acquire_window() {
        let gov = Governor::new(vec![Credential::new("tok-a")], 2);
        let resp = resp_with_headers(&[("retry-after", "30")]);
        gov.observe("tok-a", &resp);
        let creds = gov.credentials.lock().unwrap();
        assert!(creds[0].retry_after.unwrap() >= now_epoch() + 29);
    }

    #[tokio::test]
    async fn report_error_401_marks_invalid_and_aborts_when_pool_empty() {
        let gov = Governor::new(vec![Credential::new("tok-a")], 2);
        let directive = gov.report_error("tok-a", 401, "bad credentials").await;
        assert_eq!(directive, Directive::Abort);
        assert!(!gov.has_valid());
    }
}
