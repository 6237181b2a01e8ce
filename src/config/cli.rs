use crate::config::toml_config::{LoggingConfig, StoreConfig};
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Configure the store, creating its cache directory
    Init,
    /// Create a directory and all of its parents
    Mkdir { path: String },
    /// Remove a location recursively (the whole cache when omitted)
    Clear { path: Option<String> },
    /// Check whether a path exists
    Exists { path: String },
    /// Print the stored output of a cached item
    Cat {
        #[arg(required = true)]
        item: Vec<String>,
    },
    /// Store a file as the output of a cached item
    Put {
        #[arg(long)]
        file: PathBuf,
        #[arg(required = true)]
        item: Vec<String>,
    },
    /// List cached items
    Items,
    /// Evict items until the cache fits in the byte limit
    Reduce {
        #[arg(long)]
        bytes_limit: Option<u64>,
    },
}

#[derive(Debug, Clone, Parser)]
#[command(name = "hdfs-store")]
#[command(about = "Manage a memoization cache stored on HDFS")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Root path of the cache (overrides store.location)
    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub user: Option<String>,

    /// Hadoop delegation token
    #[arg(long)]
    pub token: Option<String>,

    /// Kerberos ticket cache path
    #[arg(long)]
    pub ticket_cache: Option<String>,

    /// Extra client parameter, repeatable
    #[arg(long = "par", value_parser = parse_key_val)]
    pub pars: Vec<(String, String)>,

    /// Defer connecting until the first operation
    #[arg(long)]
    pub no_connect: bool,

    #[arg(long)]
    pub tls: bool,

    #[arg(long)]
    pub compress: bool,

    #[arg(long)]
    pub mmap_mode: Option<String>,

    /// Use a local directory instead of a WebHDFS cluster
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    pub timeout_seconds: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

fn parse_key_val(value: &str) -> std::result::Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(key, val)| (key.to_string(), val.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))
}

impl Cli {
    /// Loads the configuration file if given and applies command-line overrides.
    pub fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match (&self.config, &self.location) {
            (Some(path), _) => StoreConfig::from_file(path)?,
            (None, location) => StoreConfig::new(
                validation::validate_required_field("store.location", location)?.clone(),
            ),
        };

        if let Some(location) = &self.location {
            config.store.location = location.clone();
        }
        if let Some(host) = &self.host {
            config.connection.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.connection.port = Some(port);
        }
        if let Some(user) = &self.user {
            config.connection.user = Some(user.clone());
        }
        if let Some(token) = &self.token {
            config.connection.token = Some(token.clone());
        }
        if let Some(cache) = &self.ticket_cache {
            config.connection.ticket_cache = Some(cache.clone());
        }
        for (key, value) in &self.pars {
            config.connection.pars.insert(key.clone(), value.clone());
        }
        if self.no_connect {
            config.connection.connect = false;
        }
        if self.tls {
            config.connection.use_tls = true;
        }
        if self.compress {
            config.storage.compress = true;
        }
        if let Some(mode) = &self.mmap_mode {
            config.storage.mmap_mode = Some(mode.clone());
        }
        if self.verbose || self.log_format.is_some() {
            let logging = config.logging.get_or_insert(LoggingConfig {
                format: None,
                verbose: None,
            });
            if self.verbose {
                logging.verbose = Some(true);
            }
            if let Some(format) = self.log_format {
                logging.format = Some(
                    match format {
                        LogFormat::Compact => "compact",
                        LogFormat::Json => "json",
                    }
                    .to_string(),
                );
            }
        }

        self.validate()?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .map(|seconds| Duration::from_secs(seconds as u64))
    }
}

impl Validate for Cli {
    fn validate(&self) -> Result<()> {
        if let Some(seconds) = self.timeout_seconds {
            validation::validate_positive_number("timeout_seconds", seconds, 1)?;
        }
        if let Some(root) = &self.local_root {
            if !root.is_dir() {
                return Err(StoreError::InvalidConfigValueError {
                    field: "local_root".to_string(),
                    value: root.display().to_string(),
                    reason: "Local root must be an existing directory".to_string(),
                });
            }
        }
        Ok(())
    }
}
