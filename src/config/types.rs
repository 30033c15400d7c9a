//! Configuration Types

use serde::{Deserialize, Serialize};

use crate::fuzz::FuzzKind;
use crate::protocol::ProtocolVersion;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub codec: CodecConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub ansi: bool,
}

/// Codec configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Obfuscation applied around encoded messages
    pub fuzz: FuzzKind,
    /// Version written into messages built by the CLI
    pub version: ProtocolVersion,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}
