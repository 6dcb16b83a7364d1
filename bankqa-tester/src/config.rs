use anyhow::{Context, Result};
use bankqa_core::PlayerConfig;
use bankqa_logs::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings file: `{"player": {...}, "logs": {...}}`, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    pub player: PlayerConfig,
    pub logs: ClientConfig,
}

impl TesterConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Command-line values win over the file.
    #[must_use]
    pub fn with_overrides(
        mut self,
        tick_ms: Option<u64>,
        api_base: Option<&str>,
        timeout_ms: Option<u64>,
    ) -> Self {
        if let Some(tick_ms) = tick_ms {
            self.player.tick_interval_ms = tick_ms;
        }
        if let Some(api_base) = api_base {
            self.logs.base_url = api_base.to_string();
        }
        if let Some(timeout_ms) = timeout_ms {
            self.logs.timeout_ms = timeout_ms;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = TesterConfig::load(None).unwrap();
        assert_eq!(config.player.tick_interval_ms, 500);
        assert_eq!(config.logs.base_url, "http://localhost:3001");
        assert_eq!(config.logs.timeout_ms, 10_000);
    }

    #[test]
    fn file_values_then_overrides() {
        let path = std::env::temp_dir().join("bankqa-tester-config.json");
        std::fs::write(&path, r#"{"player": {"tick_interval_ms": 20}, "logs": {"timeout_ms": 900}}"#)
            .unwrap();
        let config = TesterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.player.tick_interval_ms, 20);
        assert_eq!(config.logs.timeout_ms, 900);
        assert_eq!(config.logs.base_url, "http://localhost:3001");

        let config = config.with_overrides(None, Some("http://qa.bank:8080"), Some(100));
        assert_eq!(config.player.tick_interval_ms, 20);
        assert_eq!(config.logs.base_url, "http://qa.bank:8080");
        assert_eq!(config.logs.timeout_ms, 100);
    }

    #[test]
    fn bad_file_is_an_error() {
        let path = std::env::temp_dir().join("bankqa-tester-bad-config.json");
        std::fs::write(&path, "{player: nope").unwrap();
        assert!(TesterConfig::load(Some(&path)).is_err());
    }
}
