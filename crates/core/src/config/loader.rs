use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix. Nested keys use `__`, e.g.
/// `SHELFSYNC_CATALOG__ACCESS_TOKEN`.
const ENV_PREFIX: &str = "SHELFSYNC_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[catalog]
access_token = "token"

[matching]
worker_count = 3
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.matching.worker_count, 3);
    }

    #[test]
    fn test_load_config_from_str_missing_catalog() {
        let toml = r#"
[matching]
worker_count = 3
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/shelfsync.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[catalog]
client_id = "abc"

[tracking]
batch_size = 5
tick_interval_ms = 100
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.catalog.client_id.as_deref(), Some("abc"));
        assert_eq!(config.tracking.batch_size, 5);
        assert_eq!(config.tracking.tick_interval_ms, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[catalog]
access_token = "from-file"
"#
        )
        .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELFSYNC_CATALOG__ACCESS_TOKEN", "from-env");
            jail.set_env("SHELFSYNC_MATCHING__WORKER_COUNT", "4");

            let config = load_config(temp_file.path()).map_err(|e| e.to_string())?;
            assert_eq!(config.catalog.access_token, "from-env");
            assert_eq!(config.matching.worker_count, 4);
            Ok(())
        });
    }
}
