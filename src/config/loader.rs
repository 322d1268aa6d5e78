//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: AppConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Semantic validation; serde already covered the syntactic half.
/// Collects every violation instead of stopping at the first.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.resolve.out_dir.trim().is_empty() {
        errors.push("resolve.out_dir must not be empty".to_string());
    }
    if config.resolve.max_concurrent_fetches == 0 {
        errors.push("resolve.max_concurrent_fetches must be at least 1".to_string());
    }
    if config.upstream.endpoint.trim().is_empty() {
        errors.push("upstream.endpoint must not be empty".to_string());
    }
    if config.upstream.timeout_secs == 0 {
        errors.push("upstream.timeout_secs must be positive".to_string());
    }
    if config.server.rate <= 0.0 {
        errors.push("server.rate must be positive".to_string());
    }
    if config.server.burst == 0 {
        errors.push("server.burst must be at least 1".to_string());
    }
    if config.server.rate_ttl_secs == 0 {
        errors.push("server.rate_ttl_secs must be positive".to_string());
    }
    if !config.server.prefix.starts_with('/') {
        errors.push("server.prefix must start with '/'".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
