//! Configuration module for redbench.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::bench::BenchConfig;
use crate::commands::Command;
use crate::prepare::Handshake;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the benchmark
#[derive(Parser, Debug)]
#[command(name = "redbench")]
#[command(author = "redbench authors")]
#[command(version = "0.1.0")]
#[command(about = "A pipelined load generator for RESP servers", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Server hostname
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Password sent with AUTH on every connection
    #[arg(short, long)]
    pub auth: Option<String>,

    /// ACL username sent with AUTH (requires --auth)
    #[arg(long)]
    pub user: Option<String>,

    /// Database selected on every connection
    #[arg(long)]
    pub db: Option<u32>,

    /// Total number of requests
    #[arg(short = 'n', long)]
    pub requests: Option<usize>,

    /// Number of parallel connections
    #[arg(short, long)]
    pub clients: Option<usize>,

    /// Pipeline <numreq> requests per batch
    #[arg(short = 'P', long)]
    pub pipeline: Option<usize>,

    /// Quiet. Just show query/sec values
    #[arg(short, long)]
    pub quiet: bool,

    /// Output in CSV format
    #[arg(long)]
    pub csv: bool,

    /// Comma-separated list of tests to run (e.g. ping,set,get)
    #[arg(short, long, value_delimiter = ',')]
    pub tests: Vec<String>,

    /// Data size of SET/GET values in bytes
    #[arg(short, long)]
    pub data_size: Option<usize>,

    /// Use keys from a keyspace of this many keys (0 = a single key)
    #[arg(short = 'r', long)]
    pub keyspace: Option<u64>,

    /// Progress refresh interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub bench: BenchSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Target server configuration
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub auth: Option<String>,
    pub user: Option<String>,
    pub db: Option<u32>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: None,
            user: None,
            db: None,
        }
    }
}

/// Benchmark shape configuration
#[derive(Debug, Deserialize)]
pub struct BenchSection {
    #[serde(default = "default_requests")]
    pub requests: usize,
    #[serde(default = "default_clients")]
    pub clients: usize,
    #[serde(default = "default_pipeline")]
    pub pipeline: usize,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub csv: bool,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default = "default_data_size")]
    pub data_size: usize,
    #[serde(default)]
    pub keyspace: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            clients: default_clients(),
            pipeline: default_pipeline(),
            quiet: false,
            csv: false,
            tests: Vec::new(),
            data_size: default_data_size(),
            keyspace: 0,
            interval_ms: default_interval_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_requests() -> usize {
    100_000
}

fn default_clients() -> usize {
    50
}

fn default_pipeline() -> usize {
    1
}

fn default_data_size() -> usize {
    3
}

fn default_interval_ms() -> u64 {
    200
}

fn default_log_level() -> String {
    // Logs share the terminal with the live report
    "warn".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub handshake: Handshake,
    pub bench: BenchConfig,
    pub tests: Vec<Command>,
    pub data_size: usize,
    pub keyspace: u64,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    /// Merge parsed CLI args over the TOML file they point to, if any
    pub fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let TomlConfig {
            target,
            bench,
            logging,
        } = toml_config;

        let test_names = if cli.tests.is_empty() {
            bench.tests
        } else {
            cli.tests
        };
        let tests = if test_names.is_empty() {
            Command::ALL.to_vec()
        } else {
            test_names
                .iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| {
                    Command::from_name(name).ok_or_else(|| ConfigError::UnknownTest(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let interval_ms = cli.interval_ms.unwrap_or(bench.interval_ms);
        let bench_config = BenchConfig {
            requests: cli.requests.unwrap_or(bench.requests),
            clients: cli.clients.unwrap_or(bench.clients),
            pipeline: cli.pipeline.unwrap_or(bench.pipeline),
            quiet: cli.quiet || bench.quiet,
            csv: cli.csv || bench.csv,
            progress_interval: Duration::from_millis(interval_ms.max(1)),
        };
        bench_config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let handshake = Handshake {
            user: cli.user.or(target.user),
            password: cli.auth.or(target.auth),
            db: cli.db.or(target.db),
        };
        if handshake.user.is_some() && handshake.password.is_none() {
            return Err(ConfigError::Invalid(
                "a user requires a password".to_string(),
            ));
        }

        Ok(Config {
            host: cli.host.unwrap_or(target.host),
            port: cli.port.unwrap_or(target.port),
            handshake,
            bench: bench_config,
            tests,
            data_size: cli.data_size.unwrap_or(bench.data_size),
            keyspace: cli.keyspace.unwrap_or(bench.keyspace),
            log_level: cli.log_level.unwrap_or(logging.level),
        })
    }

    /// Target address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    UnknownTest(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::UnknownTest(name) => write!(f, "Unknown test '{}'", name),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
