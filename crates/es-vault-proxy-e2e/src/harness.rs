//! Test proxy harness for E2E tests
//!
//! Starts a complete proxy wired to a [`MockVault`] on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use es_vault_proxy::{ProxyHandler, ProxyServer, UPSTREAM_TIMEOUT};
use es_vault_proxy_secrets::{SecretClient, VaultClient};

use crate::mock_vault::MockVault;

/// Vault path the harness reads backend credentials from
pub const TEST_CONFIG_KEY: &str = "/secret/data/tracing/es";

/// A running proxy instance
pub struct TestProxy {
    /// Proxy listen address
    pub addr: SocketAddr,
    /// Vault client shared with the proxy
    pub vault: Arc<VaultClient>,
    /// Shutdown signal sender
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestProxy {
    /// Start a proxy against `vault` using `token` and the default timeout
    pub async fn start(vault: &MockVault, token: &str) -> Self {
        Self::start_with_timeout(vault, token, UPSTREAM_TIMEOUT).await
    }

    pub async fn start_with_timeout(vault: &MockVault, token: &str, timeout: Duration) -> Self {
        let client = Arc::new(
            VaultClient::new(&vault.addr_url()).expect("Failed to create Vault client"),
        );
        client.set_token(token.to_string());

        let handler = ProxyHandler::new(client.clone(), TEST_CONFIG_KEY, timeout)
            .expect("Failed to create proxy handler");
        let server = ProxyServer::new(handler);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind proxy");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                result = server.run_with_listener(listener) => {
                    if let Err(e) = result {
                        tracing::error!("Proxy error: {}", e);
                    }
                }
                _ = shutdown_rx => {
                    tracing::debug!("Proxy shutting down");
                }
            }
        });

        Self {
            addr,
            vault: client,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Full URL for a path on the proxy (e.g., "/index/_search?q=foo")
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Shutdown the proxy
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown();
    }
}
