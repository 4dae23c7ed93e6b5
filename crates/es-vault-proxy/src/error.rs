use es_vault_proxy_secrets::CredentialError;
use serde_json::json;
use thiserror::Error;

/// Per-request failures; each one becomes a 500 with a JSON body
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Invalid upstream request: {0}")]
    InvalidUpstream(String),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProxyError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Credential(CredentialError::Fetch(_)) => "credential_fetch",
            ProxyError::Credential(CredentialError::Decode(_)) => "credential_decode",
            ProxyError::InvalidUpstream(_) | ProxyError::Transport(_) => "upstream_transport",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.kind(),
            "message": self.to_string(),
        })
    }
}
