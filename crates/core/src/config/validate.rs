use super::{types::Config, ConfigError};
use crate::catalog::MAX_SEARCH_LIMIT;

/// Validate configuration
/// Currently validates:
/// - Catalog credentials: an access token or a client ID
/// - Batch sizes and worker counts are not 0
/// - Search limits are within 1..=15
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let catalog = &config.catalog;
    let has_client_id = catalog
        .client_id
        .as_ref()
        .is_some_and(|id| !id.trim().is_empty());
    if catalog.access_token.trim().is_empty() && !has_client_id {
        return Err(ConfigError::ValidationError(
            "catalog.access_token or catalog.client_id is required".to_string(),
        ));
    }

    let pools = [
        ("matching", config.matching.batch_size, config.matching.worker_count),
        ("tracking", config.tracking.batch_size, config.tracking.worker_count),
    ];
    for (section, batch_size, worker_count) in pools {
        if batch_size == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{}.batch_size cannot be 0",
                section
            )));
        }
        if worker_count == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{}.worker_count cannot be 0",
                section
            )));
        }
    }

    let limits = [
        ("matching.search_limit", config.matching.search_limit),
        ("matching.manual_search_limit", config.matching.manual_search_limit),
    ];
    for (name, limit) in limits {
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 1 and {}",
                name, MAX_SEARCH_LIMIT
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MalConfig;
    use crate::config::{LibraryConfig, MatchingConfig, TrackingConfig};

    fn valid_config() -> Config {
        Config {
            catalog: MalConfig {
                access_token: "token".to_string(),
                ..Default::default()
            },
            matching: MatchingConfig::default(),
            tracking: TrackingConfig::default(),
            library: LibraryConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_client_id_only() {
        let mut config = valid_config();
        config.catalog.access_token.clear();
        config.catalog.client_id = Some("abc".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_missing_credentials_fails() {
        let mut config = valid_config();
        config.catalog.access_token = "  ".to_string();
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = valid_config();
        config.tracking.worker_count = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("tracking.worker_count"));
    }

    #[test]
    fn test_validate_zero_batch_size_fails() {
        let mut config = valid_config();
        config.matching.batch_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("matching.batch_size"));
    }

    #[test]
    fn test_validate_search_limit_range() {
        let mut config = valid_config();
        config.matching.manual_search_limit = 16;
        assert!(validate_config(&config).is_err());

        config.matching.manual_search_limit = 15;
        config.matching.search_limit = 0;
        assert!(validate_config(&config).is_err());
    }
}
