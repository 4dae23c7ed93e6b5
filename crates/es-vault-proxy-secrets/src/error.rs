use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to Vault or loading the bootstrap token
#[derive(Debug, Error)]
pub enum SecretError {
    /// Vault address could not be parsed
    #[error("Invalid Vault address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// A `VAULT_*` setting holds a value that cannot be parsed
    #[error("Invalid value for {var}: '{value}'")]
    InvalidSetting { var: String, value: String },

    /// CA certificate could not be loaded
    #[error("Failed to load CA certificate '{path}': {message}")]
    Tls { path: PathBuf, message: String },

    /// Network failure reaching Vault
    #[error("Vault request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Vault answered with a non-success status
    #[error("Vault returned {status}: {}", .errors.join("; "))]
    Api { status: u16, errors: Vec<String> },

    /// Token file missing or unreadable
    #[error("Failed to read file '{path}': {message}")]
    FileError { path: PathBuf, message: String },

    /// Environment variable error
    #[error("Environment variable '{var}' not set")]
    EnvNotSet { var: String },
}

impl SecretError {
    /// Create an invalid address error
    pub fn invalid_address(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid setting error
    pub fn invalid_setting(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidSetting {
            var: var.into(),
            value: value.into(),
        }
    }

    /// Create an API error from a status code and Vault's `errors` array
    pub fn api(status: u16, errors: Vec<String>) -> Self {
        Self::Api { status, errors }
    }
}
