// src/config.rs
use crate::error::ConfigError;
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5678;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CONFIG_FILE: &str = "mdlive.toml";

/// Command-line arguments for the application.
///
/// `-h` is taken by the host, so help is only available as `--help`.
#[derive(Parser, Debug, Default)]
#[clap(author, version, about, long_about = None, disable_help_flag = true)]
pub struct CliArgs {
    /// Hostname from which the server will serve requests
    #[clap(short = 'h', long, value_parser, help = "Hostname from which the server will serve requests")]
    pub host: Option<String>,

    /// Port on which the server will serve requests
    #[clap(short, long, value_parser, help = "Port on which the server will serve requests")]
    pub port: Option<u16>,

    /// Enable debug logging
    #[clap(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Path to a configuration file (e.g., mdlive.toml)
    #[clap(
        short,
        long,
        value_parser,
        help = "Path to a configuration file (e.g., mdlive.toml)"
    )]
    pub config: Option<PathBuf>,

    /// Log level (e.g., trace, debug, info, warn, error)
    #[clap(
        long,
        value_parser,
        help = "Log level (e.g., trace, debug, info, warn, error)"
    )]
    pub log_level: Option<String>,

    /// Disable live reload
    #[clap(long, help = "Disable live reload of connected browsers")]
    pub no_reload: bool,

    /// Directory to serve
    #[clap(help = "Directory to serve (defaults to the current directory)")]
    pub directory: Option<PathBuf>,

    #[clap(long, action = clap::ArgAction::Help, help = "Print help")]
    help: Option<bool>,
}

/// Configuration loaded from file, environment, or defaults.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub directory: Option<PathBuf>,
    pub log_level: Option<String>,
    pub live_reload: Option<bool>,
}

impl FileConfig {
    fn defaults() -> Self {
        Self {
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            directory: Some(PathBuf::from(".")),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            live_reload: Some(true),
        }
    }
}

/// Final server configuration after merging all sources. Immutable once
/// built and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,
    /// Port to bind; also handed to the live-reload client
    pub port: u16,
    /// Directory whose files are served and watched
    pub root_directory: PathBuf,
    /// Tracing filter directive
    pub log_level: String,
    /// Whether pages embed the live-reload script and changes are pushed
    pub live_reload: bool,
}

impl ServerConfig {
    /// Parses the process arguments and merges them with file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merges defaults < config file (`[mdlive]` table) < `MDLIVE_*`
    /// environment < CLI flags, then checks the directory.
    pub fn from_args(cli_args: CliArgs) -> Result<Self, ConfigError> {
        let config_file_path = cli_args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let fig = Figment::new()
            .merge(Serialized::defaults(FileConfig::defaults()))
            .merge(Toml::file(config_file_path).nested())
            .merge(Env::prefixed("MDLIVE_").global());

        let mut merged: FileConfig = fig.select("mdlive").extract()?;

        // CLI flags always win.
        if let Some(host) = cli_args.host {
            merged.host = Some(host);
        }
        if let Some(port) = cli_args.port {
            merged.port = Some(port);
        }
        if let Some(directory) = cli_args.directory {
            merged.directory = Some(directory);
        }
        if let Some(level) = cli_args.log_level {
            merged.log_level = Some(level);
        } else if cli_args.debug {
            merged.log_level = Some("debug".to_string());
        }
        if cli_args.no_reload {
            merged.live_reload = Some(false);
        }

        let root_directory = merged.directory.unwrap_or_else(|| PathBuf::from("."));
        match std::fs::metadata(&root_directory) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ConfigError::NotADirectory(root_directory)),
            Err(_) => return Err(ConfigError::MissingDirectory(root_directory)),
        }

        Ok(ServerConfig {
            host: merged.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: merged.port.unwrap_or(DEFAULT_PORT),
            root_directory,
            log_level: merged
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            live_reload: merged.live_reload.unwrap_or(true),
        })
    }

    /// The `host:port` string to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
