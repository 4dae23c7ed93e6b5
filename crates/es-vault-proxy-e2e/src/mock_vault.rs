//! Mock Vault for E2E tests
//!
//! Answers every GET with the configured status and body and records the
//! path and `X-Vault-Token` of each read.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use parking_lot::RwLock;

use crate::mock_server::spawn_mock;

/// One read observed by the mock
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultRead {
    pub path: String,
    pub token: Option<String>,
}

struct Store {
    reads: RwLock<Vec<VaultRead>>,
    /// Status and body served for every read
    reply: RwLock<(StatusCode, String)>,
}

impl Store {
    fn answer(&self, req: &Request<Incoming>) -> Response<Full<Bytes>> {
        self.reads.write().push(VaultRead {
            path: req.uri().path().to_string(),
            token: req
                .headers()
                .get("x-vault-token")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        });

        let (status, body) = self.reply.read().clone();
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("application/json"),
        );
        response
    }
}

pub struct MockVault {
    addr: SocketAddr,
    store: Arc<Store>,
}

impl MockVault {
    /// Start a mock Vault on an ephemeral port, initially answering 404
    pub async fn start() -> Self {
        let store = Arc::new(Store {
            reads: RwLock::new(Vec::new()),
            reply: RwLock::new((StatusCode::NOT_FOUND, r#"{"errors":[]}"#.to_string())),
        });
        let shared = store.clone();
        let addr = spawn_mock(move |req| {
            let response = shared.answer(&req);
            async move { response }
        })
        .await;

        Self { addr, store }
    }

    /// Base address, as `VAULT_ADDR` would hold it
    pub fn addr_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve a KV secret carrying the backend url and basic-auth pair
    pub fn set_credential(&self, url: &str, username: &str, password: &str) {
        let body = serde_json::json!({
            "request_id": "00000000-0000-0000-0000-000000000000",
            "lease_id": "",
            "renewable": false,
            "data": {
                "url": url,
                "username": username,
                "password": password,
            },
        });
        self.set_response(StatusCode::OK, body.to_string());
    }

    /// Serve an arbitrary status and body
    pub fn set_response(&self, status: StatusCode, body: impl Into<String>) {
        *self.store.reply.write() = (status, body.into());
    }

    pub fn reads(&self) -> Vec<VaultRead> {
        self.store.reads.read().clone()
    }

    pub fn last_read(&self) -> Option<VaultRead> {
        self.store.reads.read().last().cloned()
    }
}
