//! Backend credential resolution
//!
//! Every call reads Vault. Nothing is cached, so a rotated credential is
//! picked up by the very next request.

use serde::Deserialize;
use thiserror::Error;

use crate::client::SecretClient;
use crate::error::SecretError;

/// URL and basic-auth pair for the Elasticsearch backend
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct BackendCredential {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BackendCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCredential")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct SecretEnvelope {
    data: BackendCredential,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to fetch credentials: {0}")]
    Fetch(#[from] SecretError),

    #[error("failed to decode credentials: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetch and decode the credential stored at `path`
pub async fn resolve_credential<C>(client: &C, path: &str) -> Result<BackendCredential, CredentialError>
where
    C: SecretClient + ?Sized,
{
    let body = client.read(path).await?;
    let envelope: SecretEnvelope = serde_json::from_slice(&body)?;
    Ok(envelope.data)
}
