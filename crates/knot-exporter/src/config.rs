//! Exporter configuration: CLI flags over an optional TOML file over defaults.
//!
//! ```toml
//! debug = false
//!
//! [web]
//! listen_addr = "127.0.0.1"
//! listen_port = 9433
//!
//! [knot]
//! socket_path = "/run/knot/knot.sock"
//! socket_timeout_ms = 2000
//!
//! [collect]
//! meminfo = true
//! global_stats = true
//! zone_stats = true
//! zone_status = true
//! zone_serial = true
//! zone_timers = false
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use knot_collector::CollectorConfig;
use serde::Deserialize;

use crate::cli::Cli;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1";
pub const DEFAULT_LISTEN_PORT: u16 = 9433;
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("knot control socket {0} does not exist")]
    MissingSocket(PathBuf),

    #[error("invalid listen address {0:?}: expected an IP address or localhost")]
    InvalidAddress(String),

    #[error("listen port must be non-zero")]
    InvalidPort,
}

/// On-disk config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub debug: Option<bool>,
    pub web: WebSection,
    pub knot: KnotSection,
    pub collect: CollectSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebSection {
    pub listen_addr: Option<String>,
    pub listen_port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnotSection {
    pub socket_path: Option<PathBuf>,
    pub socket_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectSection {
    pub meminfo: Option<bool>,
    pub global_stats: Option<bool>,
    pub zone_stats: Option<bool>,
    pub zone_status: Option<bool>,
    pub zone_serial: Option<bool>,
    pub zone_timers: Option<bool>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub listen_addr: String,
    pub listen_port: u16,
    pub debug: bool,
    pub skip_validation: bool,
    pub collector: CollectorConfig,
}

impl ExporterConfig {
    /// Resolve the CLI, reading the file named by `--config` if any.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, &file))
    }

    /// Merge flags over `file` over defaults. A `--no-*` flag can only
    /// disable; `--zone-timers` can only enable.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Self {
        let collect = &file.collect;
        let enabled = |flag_off: bool, file_value: Option<bool>| !flag_off && file_value.unwrap_or(true);

        let timeout_ms = cli
            .knot_socket_timeout
            .or(file.knot.socket_timeout_ms)
            .unwrap_or(DEFAULT_SOCKET_TIMEOUT_MS);

        let collector = CollectorConfig {
            socket_path: cli
                .knot_socket_path
                .clone()
                .or_else(|| file.knot.socket_path.clone())
                .unwrap_or_else(|| CollectorConfig::default().socket_path),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            collect_memory: enabled(cli.no_meminfo, collect.meminfo),
            collect_global_stats: enabled(cli.no_global_stats, collect.global_stats),
            collect_zone_stats: enabled(cli.no_zone_stats, collect.zone_stats),
            collect_zone_status: enabled(cli.no_zone_status, collect.zone_status),
            collect_zone_serial: enabled(cli.no_zone_serial, collect.zone_serial),
            collect_zone_timers: cli.zone_timers || collect.zone_timers.unwrap_or(false),
        };

        Self {
            listen_addr: cli
                .web_listen_addr
                .clone()
                .or_else(|| file.web.listen_addr.clone())
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            listen_port: cli
                .web_listen_port
                .or(file.web.listen_port)
                .unwrap_or(DEFAULT_LISTEN_PORT),
            debug: cli.debug || file.debug.unwrap_or(false),
            skip_validation: cli.skip_validation,
            collector,
        }
    }

    /// Address to bind. `localhost` maps to the IPv4 loopback.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.listen_addr.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.listen_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(self.listen_addr.clone()))?
        };
        Ok(SocketAddr::new(ip, self.listen_port))
    }

    /// Static checks run before serving. The server probe is separate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let socket = &self.collector.socket_path;
        if !socket.exists() {
            return Err(ConfigError::MissingSocket(socket.clone()));
        }
        if self.listen_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        self.socket_addr()?;
        Ok(())
    }
}
