use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use es_vault_proxy::{ProxyConfig, ProxyHandler, ProxyServer};
use es_vault_proxy_secrets::{
    SecretClient, TokenLoader, TokenManager, VaultClient, VaultSettings,
};

/// Elasticsearch proxy that injects credentials stored in Vault
#[derive(Parser, Debug)]
#[command(name = "es-vault-proxy")]
#[command(about = "Forward requests to Elasticsearch with credentials read from Vault")]
struct Args {
    /// Configuration key in Vault (default: /secret/data/tracing/es)
    #[arg(short = 'c', long)]
    config_key: Option<String>,

    /// Path to optional configuration file
    #[arg(long, default_value = "es-vault-proxy.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("es_vault_proxy=info".parse()?)
                .add_directive("es_vault_proxy_secrets=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = ProxyConfig::load(&args.config)
        .resolve(args.config_key)
        .context("Failed to resolve configuration")?;

    tracing::info!("Vault address: {}", config.vault_addr);
    tracing::info!("Config key: {}", config.config_key);

    let vault_settings = VaultSettings::from_env().context("Invalid Vault settings")?;
    tracing::info!("Vault timeout: {:?}", vault_settings.timeout);
    if let Some(namespace) = &vault_settings.namespace {
        tracing::info!("Vault namespace: {}", namespace);
    }

    let vault: Arc<dyn SecretClient> = Arc::new(
        VaultClient::with_settings(&config.vault_addr, &vault_settings)
            .context("Failed to create Vault client")?,
    );

    let tokens = TokenManager::new(
        vault.clone(),
        TokenLoader::bootstrap(&config.token_file, &config.token_env),
    );

    #[cfg(unix)]
    let _reload = tokens.start(es_vault_proxy_secrets::sigusr1);

    #[cfg(not(unix))]
    let _origin = tokens.install();

    if let Some(proxy) = std::env::var("HTTPS_PROXY").ok().filter(|p| !p.is_empty()) {
        tracing::info!("proxy: {}", proxy);
    }

    let handler = ProxyHandler::new(vault, config.config_key.clone(), config.upstream_timeout)
        .context("Failed to create upstream HTTP client")?;
    let server = ProxyServer::new(handler);

    tokio::select! {
        result = server.run(config.listen) => {
            result.context("ES proxy stopped")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("ES proxy shutdown complete");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}
