//! fsocks - SOCKS message codec tool
//!
//! Decodes captured SOCKS handshake and relay messages and builds new ones,
//! optionally passing the bytes through an obfuscation transform.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use fsocks::config::{ConfigManager, LoggingConfig};
use fsocks::fuzz::{Base16, Fuzz, FuzzKind};
use fsocks::protocol::{
    Address, AuthMethod, ClientGreeting, Command, Packet, ProtocolVersion, Reply, ReplyCode,
    Request, ServerGreeting,
};

/// CLI arguments for fsocks
#[derive(Parser, Debug)]
#[command(name = "fsocks")]
#[command(about = "fsocks - SOCKS4/SOCKS5 message codec")]
#[command(version)]
#[command(long_about = "
fsocks - SOCKS4/SOCKS5 message codec

Messages are read and printed as hexadecimal. When an obfuscation transform
is selected, the hex is the obfuscated wire form.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables (used when the configuration file is absent):
  FSOCKS_LOG_LEVEL  - Log level (trace, debug, info, warn, error)
  FSOCKS_FUZZ       - Obfuscation (plain, base64, base32, base16, xxencode, uuencode, atbash)
  FSOCKS_VERSION    - Protocol version for built messages (SOCKS4, SOCKS5)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "fsocks.toml")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Obfuscation applied to the wire bytes
    #[arg(long, global = true)]
    pub fuzz: Option<FuzzKind>,

    /// Protocol version written into built messages
    #[arg(long = "socks-version", global = true)]
    pub socks_version: Option<ProtocolVersion>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Decode one message from hex
    Decode {
        #[arg(value_enum)]
        kind: MessageKind,
        /// Wire bytes as hex, whitespace allowed
        hex: String,
        /// Print the message as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a client greeting offering the given methods
    EncodeGreeting {
        #[arg(required = true)]
        methods: Vec<AuthMethod>,
    },
    /// Build a server method selection
    EncodeSelection { method: AuthMethod },
    /// Build a relay request, e.g. `encode-request connect example.com:443`
    EncodeRequest { command: Command, address: Address },
    /// Build a relay reply; the bound address defaults to 0.0.0.0:0
    EncodeReply {
        reply: ReplyCode,
        address: Option<Address>,
    },
    /// Validate configuration and exit
    ValidateConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MessageKind {
    ClientGreeting,
    ServerGreeting,
    Request,
    Reply,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // CLI-level logging until the configuration is loaded
    let apply_logging = init_tracing(bootstrap_level(&args))?;

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.log_level.as_deref(),
        args.verbose,
        args.fuzz,
        args.socks_version,
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    apply_logging(&config.logging)?;
    debug!("fsocks v{} starting", env!("CARGO_PKG_VERSION"));

    let fuzz = config.codec.fuzz.build();
    let version = config.codec.version;

    match args.command {
        CliCommand::Decode { kind, hex, json } => decode(kind, &hex, fuzz.as_ref(), json).await,
        CliCommand::EncodeGreeting { methods } => {
            emit(&ClientGreeting::new(version, methods)?, fuzz.as_ref())
        }
        CliCommand::EncodeSelection { method } => {
            emit(&ServerGreeting::new(version, method), fuzz.as_ref())
        }
        CliCommand::EncodeRequest { command, address } => {
            emit(&Request::new(version, command, address), fuzz.as_ref())
        }
        CliCommand::EncodeReply { reply, address } => {
            let address = address.unwrap_or_else(Address::unspecified);
            emit(&Reply::new(version, reply, address), fuzz.as_ref())
        }
        CliCommand::ValidateConfig => {
            info!("Configuration is valid");
            info!("  Log level: {}", config.logging.level);
            info!("  Fuzz: {}", config.codec.fuzz);
            info!("  Protocol version: {}", config.codec.version);
            Ok(())
        }
    }
}

/// Decode one message and print it
async fn decode(kind: MessageKind, hex: &str, fuzz: &dyn Fuzz, json: bool) -> Result<()> {
    let text: String = hex
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    let wire = Base16.decode(text.as_bytes()).context("Input is not valid hex")?;
    let plain = fuzz
        .decode(&wire)
        .with_context(|| format!("Failed to undo {} obfuscation", fuzz.name()))?;
    debug!("Decoding {} bytes as {:?}", plain.len(), kind);

    let mut stream = plain.as_slice();
    let decoded = match kind {
        MessageKind::ClientGreeting => ClientGreeting::read_from(&mut stream)
            .await
            .map(|m| render(&m, json)),
        MessageKind::ServerGreeting => ServerGreeting::read_from(&mut stream)
            .await
            .map(|m| render(&m, json)),
        MessageKind::Request => Request::read_from(&mut stream)
            .await
            .map(|m| render(&m, json)),
        MessageKind::Reply => Reply::read_from(&mut stream)
            .await
            .map(|m| render(&m, json)),
    };

    let rendered = match decoded {
        Ok(rendered) => rendered?,
        Err(err) => {
            let reply = Reply::from(&err);
            warn!(
                "A server would answer with {} ({})",
                reply,
                String::from_utf8_lossy(&Base16.encode(&reply.to_bytes()))
            );
            return Err(err.into());
        }
    };
    println!("{}", rendered);

    if !stream.is_empty() {
        warn!("{} trailing bytes after the message were ignored", stream.len());
    }
    Ok(())
}

fn render<M: Display + Serialize>(message: &M, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(message).context("Failed to serialize message")
    } else {
        Ok(message.to_string())
    }
}

/// Encode a message, apply the obfuscation stage and print it as hex
fn emit<P: Packet + Display>(packet: &P, fuzz: &dyn Fuzz) -> Result<()> {
    let wire = fuzz.encode(&packet.to_bytes());
    info!(
        "Encoded {} ({} bytes, {} bytes after {})",
        packet,
        packet.encoded_len(),
        wire.len(),
        fuzz.name()
    );
    println!("{}", String::from_utf8_lossy(&Base16.encode(&wire)));
    Ok(())
}

/// Log level in effect before the configuration is loaded
fn bootstrap_level(args: &CliArgs) -> &str {
    match (&args.log_level, args.verbose) {
        (Some(level), _) => level.as_str(),
        (None, true) => "debug",
        (None, false) => "info",
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize tracing/logging
///
/// Returns a hook that switches the installed subscriber over to the
/// loaded logging configuration.
fn init_tracing(level: &str) -> Result<impl FnOnce(&LoggingConfig) -> Result<()>> {
    let (filter, filter_handle) = reload::Layer::new(env_filter(level));
    let (fmt_layer, fmt_handle) = reload::Layer::new(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .with_ansi(true),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(move |logging: &LoggingConfig| -> Result<()> {
        filter_handle
            .reload(env_filter(&logging.level))
            .context("Failed to apply log level")?;
        fmt_handle
            .modify(|layer| layer.set_ansi(logging.ansi))
            .context("Failed to apply log colouring")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_level_follows_cli_flags() {
        let args = CliArgs::try_parse_from(["fsocks", "validate-config"]).unwrap();
        assert_eq!(bootstrap_level(&args), "info");

        let args = CliArgs::try_parse_from(["fsocks", "-v", "validate-config"]).unwrap();
        assert_eq!(bootstrap_level(&args), "debug");

        let args =
            CliArgs::try_parse_from(["fsocks", "--log-level", "warn", "-v", "validate-config"])
                .unwrap();
        assert_eq!(bootstrap_level(&args), "warn");
    }

    #[test]
    fn test_logging_is_live_before_config_load() {
        // RUST_LOG overrides both levels
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let apply_logging = init_tracing("info").unwrap();
        assert!(tracing::enabled!(tracing::Level::WARN));

        let logging = LoggingConfig {
            level: "error".to_string(),
            ansi: false,
        };
        apply_logging(&logging).unwrap();
        assert!(!tracing::enabled!(tracing::Level::WARN));
        assert!(tracing::enabled!(tracing::Level::ERROR));
    }
}
