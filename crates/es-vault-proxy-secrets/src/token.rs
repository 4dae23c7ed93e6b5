//! Bootstrap token lifecycle
//!
//! The token is loaded once at startup. When it came from the token file a
//! background task waits for reload triggers (SIGUSR1 in production) and
//! reinstalls the token after each one. A reload that falls back to the
//! environment ends the watch, same as a startup that never found the file.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::client::SecretClient;
use crate::sources::{TokenLoader, TokenOrigin};

/// Payload-less notification asking for the token to be reloaded
#[async_trait]
pub trait ReloadTrigger: Send + 'static {
    /// Wait for the next trigger. `None` means no more will arrive.
    async fn triggered(&mut self) -> Option<()>;
}

#[async_trait]
impl ReloadTrigger for tokio::sync::mpsc::Receiver<()> {
    async fn triggered(&mut self) -> Option<()> {
        self.recv().await
    }
}

#[cfg(unix)]
#[async_trait]
impl ReloadTrigger for tokio::signal::unix::Signal {
    async fn triggered(&mut self) -> Option<()> {
        self.recv().await
    }
}

/// Listen for SIGUSR1
#[cfg(unix)]
pub fn sigusr1() -> std::io::Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::user_defined1())
}

/// Owns the token installed into the secret client
pub struct TokenManager {
    client: Arc<dyn SecretClient>,
    loader: TokenLoader,
}

impl TokenManager {
    pub fn new(client: Arc<dyn SecretClient>, loader: TokenLoader) -> Self {
        Self { client, loader }
    }

    /// Load from the sources and install into the client
    pub fn install(&self) -> TokenOrigin {
        let token = self.loader.load();
        let origin = token.origin;
        self.client.set_token(token.value);
        origin
    }

    /// Perform the initial load and, for file tokens only, spawn the reload
    /// watcher. `listen` is called only when a watcher is registered.
    ///
    /// Returns the watcher's handle, or `None` when hot reload is disabled.
    pub fn start<F, R>(self, listen: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> std::io::Result<R>,
        R: ReloadTrigger,
    {
        let origin = self.install();
        tracing::info!(?origin, "Vault token loaded");

        if !origin.is_reloadable() {
            tracing::info!("Token not loaded from file, hot reload disabled");
            return None;
        }

        let trigger = match listen() {
            Ok(trigger) => trigger,
            Err(e) => {
                tracing::warn!("Failed to register reload trigger: {}", e);
                return None;
            }
        };

        Some(tokio::spawn(self.watch(trigger)))
    }

    async fn watch<R: ReloadTrigger>(self, mut trigger: R) {
        while trigger.triggered().await.is_some() {
            tracing::info!("Received reload trigger, reloading Vault token");

            let origin = self.install();
            if !origin.is_reloadable() {
                tracing::warn!(?origin, "Token reload fell back, hot reload disabled");
                return;
            }
        }
        tracing::debug!("Reload trigger closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::client::VaultClient;

    fn vault() -> Arc<VaultClient> {
        Arc::new(VaultClient::new("http://127.0.0.1:8200").unwrap())
    }

    async fn wait_for_token(client: &VaultClient, expected: &str) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while &*client.token() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("token never became {}", expected));
    }

    #[tokio::test]
    async fn test_env_fallback_registers_no_listener() {
        std::env::set_var("ES_PROXY_TEST_TOKEN_FALLBACK", "abc123");
        let client = vault();
        let manager = TokenManager::new(
            client.clone(),
            TokenLoader::bootstrap("/definitely/missing/vault_token", "ES_PROXY_TEST_TOKEN_FALLBACK"),
        );

        let listened = AtomicBool::new(false);
        let handle = manager.start(|| {
            listened.store(true, Ordering::SeqCst);
            Ok(mpsc::channel::<()>(1).1)
        });

        assert!(handle.is_none());
        assert!(!listened.load(Ordering::SeqCst));
        assert_eq!(&*client.token(), "abc123");
        std::env::remove_var("ES_PROXY_TEST_TOKEN_FALLBACK");
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault_token");
        std::fs::write(&path, "tok1\n").unwrap();

        let client = vault();
        let manager = TokenManager::new(
            client.clone(),
            TokenLoader::bootstrap(&path, "ES_PROXY_TEST_TOKEN_UNUSED"),
        );

        let (tx, rx) = mpsc::channel(1);
        let handle = manager.start(|| Ok(rx)).expect("watcher should be registered");
        assert_eq!(&*client.token(), "tok1");

        std::fs::write(&path, "tok2\n").unwrap();
        tx.send(()).await.unwrap();
        wait_for_token(&client, "tok2").await;

        // the watcher survives a successful reload
        std::fs::write(&path, "tok3").unwrap();
        tx.send(()).await.unwrap();
        wait_for_token(&client, "tok3").await;

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_reload_falls_back_and_stops_watching() {
        std::env::set_var("ES_PROXY_TEST_TOKEN_RELOAD_FAIL", "env-token");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault_token");
        std::fs::write(&path, "tok1").unwrap();

        let client = vault();
        let manager = TokenManager::new(
            client.clone(),
            TokenLoader::bootstrap(&path, "ES_PROXY_TEST_TOKEN_RELOAD_FAIL"),
        );

        let (tx, rx) = mpsc::channel(1);
        let handle = manager.start(|| Ok(rx)).unwrap();

        std::fs::remove_file(&path).unwrap();
        tx.send(()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("watcher should stop after falling back")
            .unwrap();
        assert_eq!(&*client.token(), "env-token");
        std::env::remove_var("ES_PROXY_TEST_TOKEN_RELOAD_FAIL");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigusr1_reloads_file_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault_token");
        std::fs::write(&path, "tok1").unwrap();

        let client = vault();
        let manager = TokenManager::new(
            client.clone(),
            TokenLoader::bootstrap(&path, "ES_PROXY_TEST_TOKEN_UNUSED"),
        );
        let _handle = manager.start(sigusr1).expect("SIGUSR1 should be registered");
        assert_eq!(&*client.token(), "tok1");

        std::fs::write(&path, "tok2").unwrap();
        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        wait_for_token(&client, "tok2").await;
    }

    #[tokio::test]
    async fn test_listen_error_disables_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"tok1").unwrap();

        let client = vault();
        let manager = TokenManager::new(
            client.clone(),
            TokenLoader::bootstrap(file.path(), "ES_PROXY_TEST_TOKEN_UNUSED"),
        );

        let handle = manager.start(|| -> std::io::Result<mpsc::Receiver<()>> {
            Err(std::io::Error::other("no signals here"))
        });
        assert!(handle.is_none());
        assert_eq!(&*client.token(), "tok1");
    }
}
