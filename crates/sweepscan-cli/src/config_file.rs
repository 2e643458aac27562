//! Optional TOML config file, layered under CLI flags into the frozen
//! `ScanConfig` (ambient stack item: `SPEC_FULL.md` 2).

use std::time::Duration;

use serde::Deserialize;
use sweepscan_core::ScanConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_base: Option<String>,
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_transport_retries: Option<u32>,
    pub min_remaining_threshold: Option<i64>,
    pub user_agents: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Merge this file's values onto `base`; any field left `None` here
    /// keeps `base`'s value (CLI flags win, set separately by the caller).
    pub fn apply(self, mut base: ScanConfig) -> ScanConfig {
        if let Some(v) = self.api_base {
            base.api_base = v;
        }
        if let Some(v) = self.min_delay_ms {
            base.min_delay = Duration::from_millis(v);
        }
        if let Some(v) = self.max_delay_ms {
            base.max_delay = Duration::from_millis(v);
        }
        if let Some(v) = self.request_timeout_secs {
            base.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = self.max_transport_retries {
            base.max_transport_retries = v;
        }
        if let Some(v) = self.min_remaining_threshold {
            base.min_remaining_threshold = v;
        }
        if let Some(v) = self.user_agents {
            base.user_agents = v;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweepscan.toml");
        std::fs::write(&path, "min_delay_ms = 999\napi_base = \"https://ghe.example.com/api/v3\"\n").unwrap();

        let cfg = FileConfig::load(&path).unwrap().apply(ScanConfig::default());
        assert_eq!(cfg.min_delay, Duration::from_millis(999));
        assert_eq!(cfg.api_base, "https://ghe.example.com/api/v3");
        assert_eq!(cfg.max_transport_retries, ScanConfig::default().max_transport_retries);
    }

    #[test]
    fn absent_file_fields_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweepscan.toml");
        std::fs::write(&path, "").unwrap();
        let cfg = FileConfig::load(&path).unwrap().apply(ScanConfig::default());
        assert_eq!(cfg, ScanConfig::default());
    }
}
