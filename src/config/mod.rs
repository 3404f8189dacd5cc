//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::{Args, Parser, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::syndication::FeedOptions;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "colloquy";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FEED_TITLE: &str = "Colloquy comments";
const DEFAULT_MAX_ITEMS: usize = 20;
const DEFAULT_MAX_REPLY_AGE_DAYS: i64 = 31;
const DEFAULT_NAVIGATION_ANCHOR: &str = "#colloquy__comment-";
const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Command-line arguments for the Colloquy binary.
#[derive(Debug, Parser)]
#[command(name = "colloquy", version, about = "Colloquy comment feed server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "COLLOQUY_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the log level.
    #[arg(long = "log-level", value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Override the log format.
    #[arg(long = "log-format", value_enum, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Seed the in-memory store from a JSON comment dump.
    #[arg(long = "store-seed-file", value_name = "PATH")]
    pub store_seed_file: Option<PathBuf>,

    /// Serve every request uncached.
    #[arg(long = "no-cache", action = clap::ArgAction::SetTrue)]
    pub no_cache: bool,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid bind address `{value}`: {message}")]
    BindAddr { value: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub feed: FeedSettings,
    pub cache: CacheSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&value).map_err(|err| SettingsError::BindAddr {
            value,
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub title: String,
    pub max_items: usize,
    pub max_reply_age_days: i64,
    pub navigation_anchor: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_FEED_TITLE.to_string(),
            max_items: DEFAULT_MAX_ITEMS,
            max_reply_age_days: DEFAULT_MAX_REPLY_AGE_DAYS,
            navigation_anchor: DEFAULT_NAVIGATION_ANCHOR.to_string(),
        }
    }
}

impl FeedSettings {
    pub fn options(&self) -> FeedOptions {
        FeedOptions {
            title: self.title.clone(),
            max_items: self.max_items,
            max_reply_age: time::Duration::days(self.max_reply_age_days),
            navigation_anchor: self.navigation_anchor.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheSettings {
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreSettings {
    pub seed_file: Option<PathBuf>,
}

/// Load settings: optional config files, then environment, then CLI
/// overrides.
pub fn load(cli: &CliArgs) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));
    if let Some(path) = &cli.config_file {
        builder = builder.add_source(File::from(path.clone()));
    }
    let raw = builder
        .add_source(Environment::with_prefix("COLLOQUY").separator("__"))
        .build()?;

    let mut settings: Settings = raw.try_deserialize()?;
    apply_overrides(&mut settings, &cli.overrides);
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, overrides: &ServeOverrides) {
    if let Some(host) = &overrides.server_host {
        settings.server.host = host.clone();
    }
    if let Some(port) = overrides.server_port {
        settings.server.port = port;
    }
    if let Some(level) = overrides.log_level {
        settings.logging.level = level;
    }
    if let Some(format) = overrides.log_format {
        settings.logging.format = format;
    }
    if let Some(path) = &overrides.store_seed_file {
        settings.store.seed_file = Some(path.clone());
    }
    if overrides.no_cache {
        settings.cache.enabled = false;
    }
}
