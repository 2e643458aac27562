//! Frozen scan configuration, constructed once at startup (Design Note,
//! spec.md 9: "replace process-wide mutables with an explicit context
//! value"). CLI flags and an optional TOML file are merged into this
//! value by the `sweepscan-cli` crate; nothing downstream mutates it.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub api_base: String,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub request_timeout: Duration,
    pub max_transport_retries: u32,
    pub min_remaining_threshold: i64,
    pub user_agents: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            min_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(5500),
            request_timeout: Duration::from_secs(15),
            max_transport_retries: 3,
            min_remaining_threshold: 2,
            user_agents: Vec::new(),
        }
    }
}
