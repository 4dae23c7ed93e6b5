//! End-to-end test utilities for es-vault-proxy
//!
//! Runs the proxy against an in-process mock Elasticsearch backend and a
//! mock Vault, so tests need no external services.

pub mod harness;
mod mock_server;
pub mod mock_service;
pub mod mock_vault;

pub use harness::TestProxy;
pub use mock_service::{MockHttpService, RecordedRequest};
pub use mock_vault::{MockVault, VaultRead};
