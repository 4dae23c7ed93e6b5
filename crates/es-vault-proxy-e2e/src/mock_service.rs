//! Mock Elasticsearch backend for E2E tests
//!
//! Records every request it receives and answers with a configurable
//! status, header set and body.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use parking_lot::RwLock;

use crate::mock_server::spawn_mock;

/// A request as the backend saw it
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, exactly as received
    pub uri: String,
    /// One entry per header value, in arrival order
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First value of a header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).into_iter().next()
    }

    /// All values of a header (case-insensitive)
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    async fn capture(req: Request<Incoming>) -> Self {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map(|b| b.to_bytes().to_vec())
            .unwrap_or_default();

        Self {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            headers: parts
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
                .collect(),
            body,
        }
    }
}

struct Reply {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

#[derive(Default)]
struct Backend {
    requests: RwLock<Vec<RecordedRequest>>,
    reply: RwLock<Reply>,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: b"OK".to_vec(),
        }
    }
}

impl Backend {
    async fn answer(self: Arc<Self>, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let recorded = RecordedRequest::capture(req).await;
        self.requests.write().push(recorded);

        let reply = self.reply.read();
        let mut response = Response::builder().status(reply.status);
        for (name, value) in &reply.headers {
            response = response.header(name.as_str(), value.as_str());
        }
        response
            .body(Full::new(Bytes::from(reply.body.clone())))
            .expect("mock reply headers must be valid")
    }
}

/// Stand-in for the Elasticsearch cluster named in Vault
pub struct MockHttpService {
    addr: SocketAddr,
    backend: Arc<Backend>,
}

impl MockHttpService {
    /// Start on an ephemeral port, answering `200 OK` until configured
    pub async fn start() -> Self {
        let backend = Arc::new(Backend::default());
        let shared = backend.clone();
        let addr = spawn_mock(move |req| shared.clone().answer(req)).await;

        Self { addr, backend }
    }

    /// Base URL as stored in Vault (e.g., "http://127.0.0.1:12345")
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.backend.requests.read().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.backend.requests.read().last().cloned()
    }

    pub fn set_response_status(&self, status: StatusCode) {
        self.backend.reply.write().status = status;
    }

    pub fn set_response_body(&self, body: impl Into<Vec<u8>>) {
        self.backend.reply.write().body = body.into();
    }

    /// Append a response header; repeat the name for multiple values
    pub fn add_response_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.backend
            .reply
            .write()
            .headers
            .push((name.into(), value.into()));
    }
}
