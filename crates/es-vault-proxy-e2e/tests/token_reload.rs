//! Bootstrap token reload end-to-end tests

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use es_vault_proxy_e2e::{MockHttpService, MockVault, TestProxy};
use es_vault_proxy_secrets::{SecretClient, TokenLoader, TokenManager};

fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("es_vault_proxy=debug,es_vault_proxy_secrets=debug")
        .with_test_writer()
        .try_init();
}

// Write then rename so a concurrent reload never sees a half-written file
fn replace_token(path: &Path, value: &str) {
    let staging = path.with_extension("tmp");
    std::fs::write(&staging, value).unwrap();
    std::fs::rename(&staging, path).unwrap();
}

async fn wait_for_token(client: &dyn SecretClient, expected: &str) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while &*client.token() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("token never became {}", expected));
}

#[tokio::test]
async fn test_reload_trigger_switches_vault_token() {
    init_test();
    let vault = MockVault::start().await;
    let backend = MockHttpService::start().await;
    vault.set_credential(&backend.base_url(), "u", "p");
    let proxy = TestProxy::start(&vault, "").await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("vault_token");
    std::fs::write(&token_file, "tok1\n").unwrap();

    let manager = TokenManager::new(
        proxy.vault.clone(),
        TokenLoader::bootstrap(&token_file, "ES_PROXY_E2E_UNUSED_TOKEN"),
    );
    let (trigger, rx) = mpsc::channel(1);
    let _watch = manager.start(|| Ok(rx)).expect("file token should be watched");

    let client = reqwest::Client::new();
    client.get(proxy.url("/")).send().await.unwrap();
    assert_eq!(vault.last_read().unwrap().token.as_deref(), Some("tok1"));

    std::fs::write(&token_file, "tok2\n").unwrap();
    trigger.send(()).await.unwrap();
    wait_for_token(proxy.vault.as_ref(), "tok2").await;

    client.get(proxy.url("/")).send().await.unwrap();
    assert_eq!(vault.last_read().unwrap().token.as_deref(), Some("tok2"));
}

#[tokio::test]
async fn test_requests_during_reload_see_whole_tokens() {
    init_test();
    let vault = MockVault::start().await;
    let backend = MockHttpService::start().await;
    vault.set_credential(&backend.base_url(), "u", "p");
    let proxy = TestProxy::start(&vault, "").await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("vault_token");
    std::fs::write(&token_file, "tok1").unwrap();

    let manager = TokenManager::new(
        proxy.vault.clone(),
        TokenLoader::bootstrap(&token_file, "ES_PROXY_E2E_UNUSED_TOKEN"),
    );
    let (trigger, rx) = mpsc::channel(8);
    let _watch = manager.start(|| Ok(rx)).unwrap();

    let client = reqwest::Client::new();
    let requests: Vec<_> = (0..30)
        .map(|i| {
            let client = client.clone();
            let url = proxy.url(&format!("/index/_doc/{}", i));
            tokio::spawn(async move { client.get(url).send().await.unwrap().status() })
        })
        .collect();

    for i in 0..10 {
        let next = if i % 2 == 0 { "tok2" } else { "tok1" };
        replace_token(&token_file, next);
        trigger.send(()).await.unwrap();
        tokio::task::yield_now().await;
    }

    for request in requests {
        assert_eq!(request.await.unwrap(), 200);
    }

    let reads = vault.reads();
    assert_eq!(reads.len(), 30);
    for read in reads {
        let token = read.token.unwrap_or_default();
        assert!(token == "tok1" || token == "tok2", "unexpected token {:?}", token);
    }
}

#[tokio::test]
async fn test_env_fallback_without_reload() {
    init_test();
    std::env::set_var("ES_PROXY_E2E_FALLBACK_TOKEN", "abc123");
    let vault = MockVault::start().await;
    let backend = MockHttpService::start().await;
    vault.set_credential(&backend.base_url(), "u", "p");
    let proxy = TestProxy::start(&vault, "").await;

    let missing = tempfile::tempdir().unwrap().path().join("vault_token");
    let manager = TokenManager::new(
        proxy.vault.clone(),
        TokenLoader::bootstrap(missing, "ES_PROXY_E2E_FALLBACK_TOKEN"),
    );
    let watch = manager.start(|| Ok(mpsc::channel::<()>(1).1));
    assert!(watch.is_none());

    reqwest::Client::new()
        .get(proxy.url("/"))
        .send()
        .await
        .unwrap();
    assert_eq!(vault.last_read().unwrap().token.as_deref(), Some("abc123"));

    std::env::remove_var("ES_PROXY_E2E_FALLBACK_TOKEN");
}
