//! Proxy configuration with environment variable priority
//!
//! Configuration is resolved in this order (first found wins):
//! 1. Command-line flags
//! 2. Environment variables (ES_PROXY_*, plus VAULT_ADDR)
//! 3. Config file (es-vault-proxy.toml)
//! 4. Default values

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::handler::UPSTREAM_TIMEOUT;

/// Environment variable prefix
const ENV_PREFIX: &str = "ES_PROXY";

pub const DEFAULT_LISTEN: &str = "[::]:9200";
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
pub const DEFAULT_CONFIG_KEY: &str = "/secret/data/tracing/es";
pub const DEFAULT_TOKEN_FILE: &str = "secrets/vault_token";
pub const DEFAULT_TOKEN_ENV: &str = "VAULT_TOKEN";

/// Proxy configuration (parsed from TOML, can be overridden by env)
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listen address (e.g. "[::]:9200")
    pub listen: Option<String>,

    /// Vault base address
    pub vault_addr: Option<String>,

    /// Vault path holding the Elasticsearch url/username/password
    pub config_key: Option<String>,

    /// Bootstrap token file
    pub token_file: Option<PathBuf>,

    /// Environment variable used when the token file is unavailable
    pub token_env: Option<String>,

    /// Upstream request timeout in seconds
    pub upstream_timeout_secs: Option<u64>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedProxyConfig {
    pub listen: SocketAddr,
    pub vault_addr: String,
    pub config_key: String,
    pub token_file: PathBuf,
    pub token_env: String,
    pub upstream_timeout: Duration,
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

/// Get environment variable as u64
fn get_env_u64(name: &str) -> Option<u64> {
    get_env(name).and_then(|v| v.parse().ok())
}

impl ProxyConfig {
    /// Load configuration from a TOML file (optional)
    pub fn load(path: &str) -> Self {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Resolve with flag overrides, then environment, then file, then defaults
    pub fn resolve(self, config_key_flag: Option<String>) -> anyhow::Result<ResolvedProxyConfig> {
        let listen_str = get_env("LISTEN")
            .or(self.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen_str
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {}", listen_str, e))?;

        let vault_addr = env::var("VAULT_ADDR")
            .ok()
            .filter(|v| !v.is_empty())
            .or(self.vault_addr)
            .unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string());

        let config_key = config_key_flag
            .or_else(|| get_env("CONFIG_KEY"))
            .or(self.config_key)
            .unwrap_or_else(|| DEFAULT_CONFIG_KEY.to_string());
        if config_key.is_empty() {
            anyhow::bail!("Config key must not be empty. Set --config-key or ES_PROXY_CONFIG_KEY");
        }

        let token_file = get_env("TOKEN_FILE")
            .map(PathBuf::from)
            .or(self.token_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));

        let token_env = get_env("TOKEN_ENV")
            .or(self.token_env)
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());

        let upstream_timeout = get_env_u64("UPSTREAM_TIMEOUT_SECS")
            .or(self.upstream_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(UPSTREAM_TIMEOUT);

        Ok(ResolvedProxyConfig {
            listen,
            vault_addr,
            config_key,
            token_file,
            token_env,
            upstream_timeout,
        })
    }
}
