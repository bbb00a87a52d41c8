//! Configuration management

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use webnotify_hub::{HubConfig, OverflowPolicy};

/// Default limit on a POST/PUT notification body
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Command-line flags; each one falls back to an environment variable
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "webnotify-server",
    version,
    about = "Broadcast text notifications to WebSocket clients"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "WEBNOTIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP listener port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// HTML document root
    #[arg(long, alias = "docroot", env = "DOCROOT")]
    pub doc_root: Option<PathBuf>,

    /// Number of notifications to keep
    #[arg(long, alias = "buffersize", env = "BUFFERSIZE")]
    pub buffer_size: Option<usize>,

    /// Seconds between pings (0 disables)
    #[arg(long, alias = "pinginterval", env = "PINGINTERVAL")]
    pub ping_interval: Option<u64>,

    /// Live frames queued per client before the overflow policy applies
    #[arg(long, env = "QUEUEDEPTH")]
    pub queue_depth: Option<usize>,

    /// Slow client handling: block, drop-newest or disconnect
    #[arg(long, env = "OVERFLOW")]
    pub overflow: Option<OverflowPolicy>,

    /// Largest POST/PUT notification body in bytes
    #[arg(long, env = "MAXBODYBYTES")]
    pub max_body_bytes: Option<usize>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// HTTP listener port
    pub port: u16,

    /// Directory served for non-API paths (mandatory)
    pub doc_root: Option<PathBuf>,

    /// Largest POST/PUT notification body; larger requests get 413
    pub max_body_bytes: usize,

    /// Hub settings
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            port: 8080,
            doc_root: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve configuration: file (explicit or default location), then CLI/env overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: ServerConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(doc_root) = &cli.doc_root {
            self.doc_root = Some(doc_root.clone());
        }
        if let Some(buffer_size) = cli.buffer_size {
            self.hub.buffer_size = buffer_size;
        }
        if let Some(ping_interval) = cli.ping_interval {
            self.hub.ping_interval_secs = ping_interval;
        }
        if let Some(queue_depth) = cli.queue_depth {
            self.hub.queue_depth = queue_depth;
        }
        if let Some(overflow) = cli.overflow {
            self.hub.overflow = overflow;
        }
        if let Some(max_body_bytes) = cli.max_body_bytes {
            self.max_body_bytes = max_body_bytes;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.hub.validate().context("Invalid hub configuration")?;
        if self.max_body_bytes == 0 {
            bail!("max_body_bytes must be greater than zero");
        }

        match &self.doc_root {
            None => bail!("Document root is mandatory (--doc-root or DOCROOT)"),
            Some(dir) if !dir.is_dir() => {
                bail!("Document root {} is not a directory", dir.display())
            }
            Some(_) => Ok(()),
        }
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webnotify")
            .join("config.toml")
    }
}
