//! Vault client used to read backend credentials

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::SecretError;
use crate::settings::VaultSettings;

/// Capability the proxy needs from the secret store
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// Install the token used for subsequent reads
    fn set_token(&self, token: String);

    /// Currently active token
    fn token(&self) -> Arc<str>;

    /// Read the secret at `path`, returning the raw response body
    async fn read(&self, path: &str) -> Result<Bytes, SecretError>;
}

/// Holds the active token. Readers always get a whole value, old or new.
#[derive(Debug)]
pub struct TokenCell {
    inner: RwLock<Arc<str>>,
}

impl TokenCell {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self {
            inner: RwLock::new(token.into()),
        }
    }

    pub fn load(&self) -> Arc<str> {
        self.inner.read().clone()
    }

    pub fn store(&self, token: impl Into<Arc<str>>) {
        let token = token.into();
        *self.inner.write() = token;
    }
}

impl Default for TokenCell {
    fn default() -> Self {
        Self::new("")
    }
}

/// HTTP client for Vault's `/v1` API
pub struct VaultClient {
    addr: String,
    namespace: Option<String>,
    client: reqwest::Client,
    token: TokenCell,
}

impl VaultClient {
    /// Client with default settings (60 s timeout, webpki roots)
    pub fn new(addr: &str) -> Result<Self, SecretError> {
        Self::with_settings(addr, &VaultSettings::default())
    }

    pub fn with_settings(addr: &str, settings: &VaultSettings) -> Result<Self, SecretError> {
        let mut vault = Self::with_client(addr, settings.build_client()?)?;
        vault.namespace = settings.namespace.clone();
        Ok(vault)
    }

    pub fn with_client(addr: &str, client: reqwest::Client) -> Result<Self, SecretError> {
        let parsed = reqwest::Url::parse(addr)
            .map_err(|e| SecretError::invalid_address(addr, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SecretError::invalid_address(
                addr,
                "scheme must be http or https",
            ));
        }

        Ok(Self {
            addr: addr.trim_end_matches('/').to_string(),
            namespace: None,
            client,
            token: TokenCell::default(),
        })
    }

    fn read_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}/v1{}", self.addr, path)
        } else {
            format!("{}/v1/{}", self.addr, path)
        }
    }
}

#[async_trait]
impl SecretClient for VaultClient {
    fn set_token(&self, token: String) {
        self.token.store(token);
    }

    fn token(&self) -> Arc<str> {
        self.token.load()
    }

    async fn read(&self, path: &str) -> Result<Bytes, SecretError> {
        let url = self.read_url(path);
        let token = self.token.load();

        tracing::debug!("Reading Vault secret {}", path);

        let mut request = self.client.get(&url).header("X-Vault-Token", token.as_ref());
        if let Some(namespace) = &self.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp.bytes().await?)
        } else {
            Err(SecretError::api(status.as_u16(), parse_vault_errors(resp).await))
        }
    }
}

async fn parse_vault_errors(resp: reqwest::Response) -> Vec<String> {
    resp.json::<Value>()
        .await
        .ok()
        .and_then(|v| {
            v.get("errors")?.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|e| e.as_str().map(String::from))
                    .collect()
            })
        })
        .unwrap_or_default()
}
