use crate::error::{BlockchainError, Result};
use crate::network::message::MAX_MESSAGE_SIZE;
use log::warn;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Defaults overlaid with `CHAIN_*` environment variables, read once.
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub const DEFAULT_PORT_START: u16 = 50000;
pub const DEFAULT_PORT_END: u16 = 50100;
const DEFAULT_BIND_ATTEMPTS: u32 = 1000;
const DEFAULT_POLL_BACKOFF_US: u64 = 100;
const DEFAULT_VOTE_WINDOW_MS: u64 = 5;
const DEFAULT_RESYNC_MS: u64 = 100;
const DEFAULT_RECV_BUFFER: usize = 2048;

const PORT_START_KEY: &str = "CHAIN_PORT_START";
const PORT_END_KEY: &str = "CHAIN_PORT_END";
const BIND_ATTEMPTS_KEY: &str = "CHAIN_BIND_ATTEMPTS";
const POLL_BACKOFF_KEY: &str = "CHAIN_POLL_BACKOFF_US";
const VOTE_WINDOW_KEY: &str = "CHAIN_VOTE_WINDOW_MS";
const RESYNC_KEY: &str = "CHAIN_RESYNC_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address every peer binds and sends to.
    pub host: Ipv4Addr,
    /// First port of the discovery range.
    pub port_start: u16,
    /// Last port of the discovery range (inclusive).
    pub port_end: u16,
    /// Random bind attempts before giving up on the range.
    pub max_bind_attempts: u32,
    /// Sleep between empty polls of the receive socket.
    pub poll_backoff: Duration,
    /// How long a sync round collects votes after its first one.
    pub vote_window: Duration,
    /// Idle time after which the synchronizer restarts from index 0.
    pub resync_interval: Duration,
    pub recv_buffer_size: usize,
}

/// Optional settings read from a TOML file. Unset keys keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port_start: Option<u16>,
    pub port_end: Option<u16>,
    pub bind_attempts: Option<u32>,
    pub poll_backoff_us: Option<u64>,
    pub vote_window_ms: Option<u64>,
    pub resync_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: Ipv4Addr::LOCALHOST,
            port_start: DEFAULT_PORT_START,
            port_end: DEFAULT_PORT_END,
            max_bind_attempts: DEFAULT_BIND_ATTEMPTS,
            poll_backoff: Duration::from_micros(DEFAULT_POLL_BACKOFF_US),
            vote_window: Duration::from_millis(DEFAULT_VOTE_WINDOW_MS),
            resync_interval: Duration::from_millis(DEFAULT_RESYNC_MS),
            recv_buffer_size: DEFAULT_RECV_BUFFER,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment. Malformed variables
    /// are reported and ignored.
    pub fn new() -> Config {
        let defaults = Config::default();
        match defaults.clone().with_env(|key| env::var(key).ok()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring environment configuration: {e}");
                defaults
            }
        }
    }

    /// Overlay values found through `lookup` (an environment accessor).
    pub fn with_env<F>(mut self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, PORT_START_KEY)? {
            self.port_start = v;
        }
        if let Some(v) = parse_var(&lookup, PORT_END_KEY)? {
            self.port_end = v;
        }
        if let Some(v) = parse_var(&lookup, BIND_ATTEMPTS_KEY)? {
            self.max_bind_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, POLL_BACKOFF_KEY)? {
            self.poll_backoff = Duration::from_micros(v);
        }
        if let Some(v) = parse_var(&lookup, VOTE_WINDOW_KEY)? {
            self.vote_window = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, RESYNC_KEY)? {
            self.resync_interval = Duration::from_millis(v);
        }
        Ok(self)
    }

    /// Overlay the settings of a TOML file.
    pub fn with_file(self, path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let file: FileConfig = toml::from_str(&text)?;
        Ok(self.with_file_config(file))
    }

    pub fn with_file_config(mut self, file: FileConfig) -> Config {
        if let Some(v) = file.port_start {
            self.port_start = v;
        }
        if let Some(v) = file.port_end {
            self.port_end = v;
        }
        if let Some(v) = file.bind_attempts {
            self.max_bind_attempts = v;
        }
        if let Some(v) = file.poll_backoff_us {
            self.poll_backoff = Duration::from_micros(v);
        }
        if let Some(v) = file.vote_window_ms {
            self.vote_window = Duration::from_millis(v);
        }
        if let Some(v) = file.resync_ms {
            self.resync_interval = Duration::from_millis(v);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.port_start > self.port_end {
            return Err(BlockchainError::Config(format!(
                "Port range {}-{} is inverted",
                self.port_start, self.port_end
            )));
        }
        // One node binds a send port and a receive port.
        if self.port_end - self.port_start < 1 {
            return Err(BlockchainError::Config(format!(
                "Port range {}-{} cannot hold the two ports a node needs",
                self.port_start, self.port_end
            )));
        }
        if self.max_bind_attempts == 0 {
            return Err(BlockchainError::Config(
                "Bind attempts must be positive".to_string(),
            ));
        }
        if self.poll_backoff.is_zero() || self.vote_window.is_zero() {
            return Err(BlockchainError::Config(
                "Poll backoff and vote window must be positive".to_string(),
            ));
        }
        if self.resync_interval <= self.vote_window {
            return Err(BlockchainError::Config(
                "Resync interval must be longer than the vote window".to_string(),
            ));
        }
        if self.recv_buffer_size < MAX_MESSAGE_SIZE {
            return Err(BlockchainError::Config(format!(
                "Receive buffer of {} bytes is smaller than the largest message ({MAX_MESSAGE_SIZE})",
                self.recv_buffer_size
            )));
        }
        Ok(())
    }

    pub fn ports(&self) -> RangeInclusive<u16> {
        self.port_start..=self.port_end
    }

    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, port))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| BlockchainError::Config(format!("Invalid value for {key}: {raw}"))),
    }
}
