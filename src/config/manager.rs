//! Configuration Manager

use super::Config;
use crate::fuzz::FuzzKind;
use crate::protocol::ProtocolVersion;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use std::path::Path;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(log_level) = std::env::var("FSOCKS_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(fuzz) = std::env::var("FSOCKS_FUZZ") {
            config.codec.fuzz = fuzz
                .parse::<FuzzKind>()
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("Invalid FSOCKS_FUZZ: {}", fuzz))?;
        }

        if let Ok(version) = std::env::var("FSOCKS_VERSION") {
            config.codec.version = version
                .parse::<ProtocolVersion>()
                .with_context(|| format!("Invalid FSOCKS_VERSION: {}", version))?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    /// Validate logging configuration
    fn validate_logging_config(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", VALID_LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        log_level: Option<&str>,
        verbose: bool,
        fuzz: Option<FuzzKind>,
        version: Option<ProtocolVersion>,
    ) {
        // Verbose wins over an explicit level
        if verbose {
            self.logging.level = "debug".to_string();
            tracing::debug!("CLI override: verbose logging enabled");
        } else if let Some(level) = log_level {
            self.logging.level = level.to_string();
            tracing::debug!("CLI override: log level set to {}", level);
        }

        if let Some(fuzz) = fuzz {
            self.codec.fuzz = fuzz;
            tracing::debug!("CLI override: fuzz set to {}", fuzz);
        }

        if let Some(version) = version {
            self.codec.version = version;
            tracing::debug!("CLI override: protocol version set to {}", version);
        }
    }
}
