use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::MalConfig;
use crate::library::{SourceId, MYANIMELIST_SOURCE};
use crate::scheduler::BatchPolicy;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub catalog: MalConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

/// Matching pass configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Titles searched per tick (default: 1)
    #[serde(default = "default_matching_batch_size")]
    pub batch_size: usize,
    /// Searches running at once (default: 1)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Delay between batches (default: 2000)
    #[serde(default = "default_matching_tick_ms")]
    pub tick_interval_ms: u64,
    /// Candidates requested per title (default: 5)
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Candidates requested for manual re-matching (default: 15)
    #[serde(default = "default_manual_search_limit")]
    pub manual_search_limit: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_matching_batch_size(),
            worker_count: default_worker_count(),
            tick_interval_ms: default_matching_tick_ms(),
            search_limit: default_search_limit(),
            manual_search_limit: default_manual_search_limit(),
        }
    }
}

impl MatchingConfig {
    pub fn policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: self.batch_size,
            worker_count: self.worker_count,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
        }
    }
}

/// Tracking pass configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Links committed per tick (default: 10)
    #[serde(default = "default_tracking_batch_size")]
    pub batch_size: usize,
    /// Commits running at once (default: 1)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Delay between batches (default: 800)
    #[serde(default = "default_tracking_tick_ms")]
    pub tick_interval_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_tracking_batch_size(),
            worker_count: default_worker_count(),
            tick_interval_ms: default_tracking_tick_ms(),
        }
    }
}

impl TrackingConfig {
    pub fn policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: self.batch_size,
            worker_count: self.worker_count,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
        }
    }
}

/// Library configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Tracker ID whose links are reconciled (default: 1, MyAnimeList)
    #[serde(default = "default_target_source")]
    pub target_source_id: SourceId,
    /// Backup used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            target_source_id: default_target_source(),
            backup_path: None,
        }
    }
}

fn default_matching_batch_size() -> usize {
    1
}

fn default_tracking_batch_size() -> usize {
    10
}

fn default_worker_count() -> usize {
    1
}

fn default_matching_tick_ms() -> u64 {
    2000
}

fn default_tracking_tick_ms() -> u64 {
    800
}

fn default_search_limit() -> u32 {
    5
}

fn default_manual_search_limit() -> u32 {
    15
}

fn default_target_source() -> SourceId {
    MYANIMELIST_SOURCE
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub catalog: SanitizedCatalogConfig,
    pub matching: MatchingConfig,
    pub tracking: TrackingConfig,
    pub library: LibraryConfig,
}

/// Sanitized catalog config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub access_token_configured: bool,
    pub client_id_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            catalog: SanitizedCatalogConfig {
                access_token_configured: !config.catalog.access_token.is_empty(),
                client_id_configured: config
                    .catalog
                    .client_id
                    .as_ref()
                    .is_some_and(|id| !id.is_empty()),
                base_url: config.catalog.base_url.clone(),
                timeout_secs: config.catalog.timeout_secs,
            },
            matching: config.matching.clone(),
            tracking: config.tracking.clone(),
            library: config.library.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[catalog]
access_token = "token"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog.timeout_secs, 30);
        assert_eq!(config.matching.batch_size, 1);
        assert_eq!(config.matching.worker_count, 1);
        assert_eq!(config.matching.tick_interval_ms, 2000);
        assert_eq!(config.matching.search_limit, 5);
        assert_eq!(config.matching.manual_search_limit, 15);
        assert_eq!(config.tracking.batch_size, 10);
        assert_eq!(config.tracking.tick_interval_ms, 800);
        assert_eq!(config.library.target_source_id, 1);
        assert!(config.library.backup_path.is_none());
    }

    #[test]
    fn test_deserialize_missing_catalog_fails() {
        let toml = r#"
[matching]
batch_size = 2
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[catalog]
client_id = "abc123"
base_url = "http://localhost:9000/v2"
timeout_secs = 5

[matching]
batch_size = 4
worker_count = 4
tick_interval_ms = 500

[tracking]
worker_count = 2

[library]
target_source_id = 2
backup_path = "/data/library.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog.client_id.as_deref(), Some("abc123"));
        assert!(config.catalog.access_token.is_empty());

        let policy = config.matching.policy();
        assert_eq!(policy.batch_size, 4);
        assert_eq!(policy.tick_interval, Duration::from_millis(500));
        assert_eq!(config.tracking.policy().worker_count, 2);
        assert_eq!(config.tracking.policy().batch_size, 10);
        assert_eq!(config.library.target_source_id, 2);
        assert_eq!(
            config.library.backup_path.as_deref().and_then(|p| p.to_str()),
            Some("/data/library.json")
        );
    }

    #[test]
    fn test_sanitized_config() {
        let config = Config {
            catalog: MalConfig {
                access_token: "secret-token".to_string(),
                ..Default::default()
            },
            matching: MatchingConfig::default(),
            tracking: TrackingConfig::default(),
            library: LibraryConfig::default(),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.catalog.access_token_configured);
        assert!(!sanitized.catalog.client_id_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-token"));
    }
}
