use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::addr::Addr;

/// Client configuration.
///
/// Only `local_port`, `key` and `broker` are required; everything else has a
/// default suited to a small tunnel.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host of the local service requests are relayed to
    #[serde(default = "default_local_host")]
    pub local_host: String,

    /// Port of the local service
    pub local_port: u16,

    /// Shared secret used to create the session
    pub key: String,

    /// Broker address (`host`, `host:port` or `http://host:port`)
    pub broker: String,

    /// Number of slots registered with the broker at once
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Chunk size used when copying a request body to the local service
    #[serde(default = "default_pipe_chunk_size")]
    pub pipe_chunk_size: usize,

    /// Chunk size used when streaming the response back to the broker
    #[serde(default = "default_response_chunk_size")]
    pub response_chunk_size: usize,

    /// Upper bound on the size of a request line plus headers
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,

    /// Pause between failed registration attempts
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

fn default_local_host() -> String {
    "127.0.0.1".to_string()
}

fn default_pool_size() -> usize {
    5
}

fn default_pipe_chunk_size() -> usize {
    1024
}

fn default_response_chunk_size() -> usize {
    64
}

fn default_max_header_bytes() -> usize {
    8192
}

fn default_retry_interval_ms() -> u64 {
    3000
}

impl Config {
    /// Builds a config for the given local port, key and broker with every
    /// tunable left at its default.
    pub fn new(local_port: u16, key: impl Into<String>, broker: impl Into<String>) -> Self {
        Self {
            local_host: default_local_host(),
            local_port,
            key: key.into(),
            broker: broker.into(),
            pool_size: default_pool_size(),
            pipe_chunk_size: default_pipe_chunk_size(),
            response_chunk_size: default_response_chunk_size(),
            max_header_bytes: default_max_header_bytes(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("invalid config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    /// Loads the config the binary runs with.
    ///
    /// Reads the YAML file named by `BURROW_CONFIG` when set, then applies the
    /// `BURROW_LOCAL_HOST`, `BURROW_LOCAL_PORT`, `BURROW_KEY` and
    /// `BURROW_BROKER` overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("BURROW_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::new(0, "", ""),
        };

        if let Ok(host) = std::env::var("BURROW_LOCAL_HOST") {
            cfg.local_host = host;
        }
        if let Ok(port) = std::env::var("BURROW_LOCAL_PORT") {
            cfg.local_port = port
                .parse()
                .with_context(|| format!("invalid BURROW_LOCAL_PORT {port:?}"))?;
        }
        if let Ok(key) = std::env::var("BURROW_KEY") {
            cfg.key = key;
        }
        if let Ok(broker) = std::env::var("BURROW_BROKER") {
            cfg.broker = broker;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.local_port == 0 {
            bail!("local_port must be set");
        }
        if self.key.is_empty() {
            bail!("key must be set");
        }
        if self.broker.is_empty() {
            bail!("broker must be set");
        }
        if self.pool_size == 0 {
            bail!("pool_size must be at least 1");
        }
        if self.pipe_chunk_size == 0 || self.response_chunk_size == 0 {
            bail!("chunk sizes must be at least 1");
        }
        if self.max_header_bytes == 0 {
            bail!("max_header_bytes must be at least 1");
        }
        Ok(())
    }

    pub fn local_addr(&self) -> Addr {
        Addr::new(self.local_host.clone(), self.local_port)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}
