use std::fmt;

use rewritarr_rewrite::RewriteConfig;
use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub listen: ListenConfig,
    pub upstream: Option<UpstreamProxy>,
    pub rewrite: RewriteConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

/// Second proxy hop the outbound requests are routed through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpstreamProxy {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub request_secs: u64,
    pub connect_secs: u64,
    pub tunnel_idle_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig {
                host: "0.0.0.0".to_string(),
                port: 5008,
            },
            upstream: None,
            rewrite: RewriteConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            connect_secs: 10,
            tunnel_idle_secs: 30,
        }
    }
}

impl UpstreamProxy {
    pub fn parse(value: &str) -> Result<Self, ProxyError> {
        let (host, port) = value.trim().rsplit_once(':').ok_or_else(|| {
            ProxyError::Config(format!("UPSTREAM_PROXY must be host:port, got '{value}'"))
        })?;
        if host.is_empty() {
            return Err(ProxyError::Config(format!(
                "UPSTREAM_PROXY has an empty host in '{value}'"
            )));
        }
        let port = port.parse::<u16>().map_err(|_| {
            ProxyError::Config(format!("invalid UPSTREAM_PROXY port in '{value}'"))
        })?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for UpstreamProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl ProxyConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ProxyError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProxyError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PROXY_PORT") {
            config.listen.port = port
                .trim()
                .parse()
                .map_err(|_| ProxyError::Config(format!("invalid PROXY_PORT '{port}'")))?;
        }

        if let Some(upstream) = lookup("UPSTREAM_PROXY") {
            if !upstream.trim().is_empty() {
                config.upstream = Some(UpstreamProxy::parse(&upstream)?);
            }
        }

        config.rewrite.music = bool_value(&lookup, "REWRITE_MUSIC", config.rewrite.music);
        config.rewrite.books = bool_value(&lookup, "REWRITE_BOOKS", config.rewrite.books);
        config.rewrite.audiobooks =
            bool_value(&lookup, "REWRITE_AUDIOBOOKS", config.rewrite.audiobooks);
        config.rewrite.best_effort =
            bool_value(&lookup, "BEST_EFFORT", config.rewrite.best_effort);
        config.rewrite.debug_attrs =
            bool_value(&lookup, "DEBUG_ATTRS", config.rewrite.debug_attrs);

        Ok(config)
    }
}

fn bool_value(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match lookup(name) {
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}
