//! Elasticsearch proxy with Vault-backed credential injection
//!
//! Each request looks up the backend URL and basic-auth credential in Vault,
//! then forwards method, path, query, headers and body to the backend with
//! the `Authorization` header replaced. The response is streamed back as-is.

mod config;
mod error;
mod handler;
mod server;

// Re-export public types
pub use config::{
    ProxyConfig, ResolvedProxyConfig, DEFAULT_CONFIG_KEY, DEFAULT_LISTEN, DEFAULT_TOKEN_ENV,
    DEFAULT_TOKEN_FILE, DEFAULT_VAULT_ADDR,
};
pub use error::ProxyError;
pub use handler::{
    outbound_headers, upstream_request_url, upstream_url, BoxError, ProxyBody, ProxyHandler,
    UPSTREAM_TIMEOUT,
};
pub use server::ProxyServer;
