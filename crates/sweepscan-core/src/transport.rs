//! Stateless HTTP request executor: connection reuse, jittered delay,
//! random user-agent, bounded retry on transient 5xx.
//!
//! Grounded on `original_source/src/utils/http_client.py`'s `HttpClient`,
//! re-expressed with a pooled `reqwest::Client` instead of a `requests.Session`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;

use crate::error::TransportError;

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
];

/// A parsed HTTP response: status, headers, and raw body.
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
}

impl Response {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub struct Transport {
    client: reqwest::Client,
    user_agents: Vec<String>,
    min_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
}

impl Transport {
    pub fn new(timeout: Duration, min_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self::with_user_agents(timeout, min_delay, max_delay, max_retries, Vec::new())
    }

    pub fn with_user_agents(
        timeout: Duration,
        min_delay: Duration,
        max_delay: Duration,
        max_retries: u32,
        user_agents: Vec<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with static config");

        let user_agents = if user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            user_agents
        };

        Self {
            client,
            user_agents,
            min_delay,
            max_delay,
            max_retries,
        }
    }

    fn random_user_agent(&self) -> &str {
        let idx = fastrand::usize(..self.user_agents.len());
        &self.user_agents[idx]
    }

    fn jitter_delay(&self) -> Duration {
        if self.min_delay >= self.max_delay {
            return self.min_delay;
        }
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(fastrand::u64(min_ms..=max_ms))
    }

    /// Issue a GET request. `bearer` becomes the `Authorization: Bearer <..>` header.
    /// Retries transient 5xx with exponential backoff (base 1s, factor 1) up to
    /// `max_retries`; never retries 4xx responses.
    pub async fn fetch(
        &self,
        url: &str,
        bearer: Option<&str>,
        query_params: &[(&str, &str)],
        apply_jitter: bool,
    ) -> Result<Response, TransportError> {
        if apply_jitter {
            tokio::time::sleep(self.jitter_delay()).await;
        }

        let mut attempt = 0u32;
        loop {
            let mut headers = HeaderMap::new();
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(self.random_user_agent()).unwrap(),
            );
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github.v3+json"),
            );
            if let Some(bearer) = bearer {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {bearer}"))
                        .map_err(|e| TransportError::Connection(e.to_string()))?,
                );
            }

            let send_result = self
                .client
                .get(url)
                .headers(headers)
                .query(query_params)
                .send()
                .await;

            let resp = match send_result {
                Ok(r) => r,
                Err(e) if e.is_timeout() => return Err(TransportError::Timeout),
                Err(e) => return Err(TransportError::Connection(e.to_string())),
            };

            let status = resp.status();
            if status.is_server_error() && attempt < self.max_retries {
                attempt += 1;
                let backoff = Duration::from_secs(1u64 << (attempt - 1).min(4));
                log::warn!("transient {status} from {url}, retry {attempt}/{} after {backoff:?}", self.max_retries);
                tokio::time::sleep(backoff).await;
                continue;
            }

            let headers = resp.headers().clone();
            let body = resp
                .bytes()
                .await
                .map_err(|e| TransportError::Connection(e.to_string()))?;

            return Ok(Response { status, headers, body });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_delay_respects_range() {
        let t = Transport::new(
            Duration::from_secs(15),
            Duration::from_millis(10),
            Duration::from_millis(20),
            3,
        );
        for _ in 0..50 {
            let d = t.jitter_delay();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn fixed_delay_when_min_equals_max() {
        let t = Transport::new(
            Duration::from_secs(15),
            Duration::from_millis(50),
            Duration::from_millis(50),
            3,
        );
        assert_eq!(t.jitter_delay(), Duration::from_millis(50));
    }

    #[test]
    fn falls_back_to_default_user_agent_pool() {
        let t = Transport::new(
            Duration::from_secs(15),
            Duration::from_millis(0),
            Duration::from_millis(0),
            3,
        );
        assert_eq!(t.user_agents.len(), DEFAULT_USER_AGENTS.len());
    }
}
