//! Vault access for es-vault-proxy
//!
//! - [`VaultClient`]: reads secrets over Vault's HTTP API with a hot-swappable token
//! - [`VaultSettings`]: timeout, TLS and namespace from the standard `VAULT_*` variables
//! - [`TokenManager`]: loads the bootstrap token (file, then environment) and
//!   reinstalls it on each reload trigger
//! - [`resolve_credential`]: fetches the Elasticsearch URL and basic-auth pair
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use es_vault_proxy_secrets::{resolve_credential, TokenLoader, TokenManager, VaultClient};
//!
//! let vault = Arc::new(VaultClient::new("https://vault:8200")?);
//! TokenManager::new(vault.clone(), TokenLoader::bootstrap("secrets/vault_token", "VAULT_TOKEN"))
//!     .start(es_vault_proxy_secrets::sigusr1);
//!
//! let cred = resolve_credential(vault.as_ref(), "/secret/data/tracing/es").await?;
//! ```

mod client;
mod credential;
mod error;
mod settings;
mod sources;
mod token;

pub use client::{SecretClient, TokenCell, VaultClient};
pub use credential::{resolve_credential, BackendCredential, CredentialError};
pub use error::SecretError;
pub use settings::{VaultSettings, DEFAULT_VAULT_TIMEOUT};
pub use sources::{BootstrapToken, EnvSource, FileSource, TokenLoader, TokenOrigin, TokenSource};
#[cfg(unix)]
pub use token::sigusr1;
pub use token::{ReloadTrigger, TokenManager};
