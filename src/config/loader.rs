//! Configuration Loader
//!
//! Environment-aware configuration loading. Merges code defaults, optional
//! TOML files and environment variables through the `config` crate, then
//! validates the result.

use super::error::{ConfigResult, ConfigurationError};
use super::AuditConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "brand-audit";
const ENV_PREFIX: &str = "BRAND_AUDIT";

/// Well-known credential variables mapped onto `credentials.*`
const CREDENTIAL_ENV_VARS: [(&str, &str); 4] = [
    ("OPENROUTER_API_KEY", "credentials.openrouter_api_key"),
    ("NEWS_API_KEY", "credentials.news_api_key"),
    ("BRANDFETCH_API_KEY", "credentials.brandfetch_api_key"),
    ("SCREENSHOT_API_KEY", "credentials.screenshot_api_key"),
];

/// Owner of the loaded, validated configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: AuditConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with an explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = environment,
            max_concurrent_calls = config.orchestration.max_concurrent_calls,
            worker_pool_size = config.orchestration.worker_pool_size,
            failure_threshold = config.circuit_breakers.failure_threshold,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding applications)
    pub fn from_config(config: AuditConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    fn build(config_directory: &Path, environment: &str) -> ConfigResult<AuditConfig> {
        let defaults = Config::try_from(&AuditConfig::default())?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(config_directory.join(format!("{CONFIG_FILE_STEM}.toml")))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                File::from(config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.toml")))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        for (variable, key) in CREDENTIAL_ENV_VARS {
            builder = builder.set_override_option(key, env::var(variable).ok())?;
        }

        let merged = builder.build()?;
        merged
            .try_deserialize::<AuditConfig>()
            .map_err(|e| ConfigurationError::DeserializationError(e.to_string()))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with credentials masked
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null);
        Self::mask_sensitive(&mut value);
        value
    }

    fn mask_sensitive(value: &mut serde_json::Value) {
        const SENSITIVE: [&str; 4] = ["key", "secret", "token", "password"];

        if let serde_json::Value::Object(map) = value {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                if SENSITIVE.iter().any(|pattern| key_lower.contains(pattern)) {
                    if let serde_json::Value::String(s) = val {
                        let chars: Vec<char> = s.chars().collect();
                        *val = serde_json::Value::String(if chars.len() > 4 {
                            let head: String = chars[..2].iter().collect();
                            let tail: String = chars[chars.len() - 2..].iter().collect();
                            format!("[MASKED: {head}***{tail}]")
                        } else {
                            "[MASKED]".to_string()
                        });
                    }
                } else {
                    Self::mask_sensitive(val);
                }
            }
        }
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("BRAND_AUDIT_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
