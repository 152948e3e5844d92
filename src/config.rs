//! Tunnel configuration
//!
//! Loaded either from a YAML file or from environment variables.
//!
//! ```yaml
//! proxy_url: "http://proxy.internal:3128"
//! target: "example.com:443"
//! headers:
//!   Proxy-Authorization: "Basic dXNlcjpwYXNz"
//! connect_timeout_ms: 5000
//! handshake_timeout_ms: 10000
//! ```

use crate::proxy::handler::is_valid_header;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3128";
const DEFAULT_TARGET: &str = "example.com:443";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Forward proxy, e.g. `http://proxy.internal:3128`
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    /// CONNECT target including the port
    #[serde(default = "default_target")]
    pub target: String,

    /// Static headers sent with the CONNECT request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

fn default_proxy_url() -> String {
    DEFAULT_PROXY_URL.to_string()
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_handshake_timeout_ms() -> u64 {
    10000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: default_proxy_url(),
            target: default_target(),
            headers: HashMap::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// `TUNNEL_CONFIG` points at a YAML file. Without it, `PROXY_URL` and
    /// `TUNNEL_TARGET` override the defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("TUNNEL_CONFIG") {
            return Self::from_file(path);
        }

        let mut cfg = Self::default();
        if let Ok(proxy_url) = std::env::var("PROXY_URL") {
            cfg.proxy_url = proxy_url;
        }
        if let Ok(target) = std::env::var("TUNNEL_TARGET") {
            cfg.target = target;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(yaml).context("Invalid YAML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the proxy URL, the target, and that every header fits on one line.
    pub fn validate(&self) -> Result<()> {
        self.proxy_addr()?;
        if self.target.trim().is_empty() {
            anyhow::bail!("Tunnel target must not be empty");
        }
        if let Some((key, _)) = self.headers.iter().find(|(k, v)| !is_valid_header(k, v)) {
            anyhow::bail!("Invalid header {:?}: names and values must be a single line", key);
        }
        Ok(())
    }

    /// `host:port` of the proxy, with the port defaulted from the URL scheme.
    pub fn proxy_addr(&self) -> Result<String> {
        let url = url::Url::parse(&self.proxy_url)
            .with_context(|| format!("Invalid proxy URL: {}", self.proxy_url))?;

        let host = url.host_str().context("Proxy URL missing host")?;
        let port = url
            .port_or_known_default()
            .context("Proxy URL missing port")?;

        Ok(format!("{}:{}", host, port))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}
