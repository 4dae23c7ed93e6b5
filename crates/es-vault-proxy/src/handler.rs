//! Per-request forwarding pipeline
//!
//! resolve credential -> build upstream URL -> copy headers + inject basic
//! auth -> stream body upstream -> mirror status, headers and body back.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use futures_util::{future, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, BodyStream, Full, StreamBody};
use hyper::body::{Body, Frame, Incoming};
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, HOST};
use hyper::{HeaderMap, Request, Response, StatusCode, Uri};

use es_vault_proxy_secrets::{resolve_credential, BackendCredential, SecretClient};

use crate::error::ProxyError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type returned to callers: either a streamed upstream body or a
/// small JSON error document
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;

/// Overall timeout for one upstream exchange, body included
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards requests to the Elasticsearch backend named in Vault
pub struct ProxyHandler {
    secrets: Arc<dyn SecretClient>,
    config_key: String,
    client: reqwest::Client,
}

impl ProxyHandler {
    pub fn new(
        secrets: Arc<dyn SecretClient>,
        config_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            secrets,
            config_key: config_key.into(),
            client,
        })
    }

    /// Handle one request. Always produces a response.
    pub async fn handle(&self, req: Request<Incoming>) -> Response<ProxyBody> {
        tracing::info!("incoming: {} {}", req.method(), req.uri());

        match self.forward(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("{}", e);
                error_response(&e)
            }
        }
    }

    async fn forward(&self, req: Request<Incoming>) -> Result<Response<ProxyBody>, ProxyError> {
        let credential = resolve_credential(self.secrets.as_ref(), &self.config_key).await?;

        let (parts, body) = req.into_parts();

        let url = upstream_request_url(&credential.url, &parts.uri)?;
        let headers = outbound_headers(&parts.headers, &credential)?;

        let mut request = self
            .client
            .request(parts.method.clone(), url.clone())
            .headers(headers);

        if !body.is_end_stream() {
            let stream = BodyStream::new(body)
                .try_filter_map(|frame| future::ready(Ok(frame.into_data().ok())));
            request = request.body(reqwest::Body::wrap_stream(stream));
        }

        let upstream = request.send().await?;
        let status = upstream.status();

        tracing::info!("outgoing: {} {} {}", parts.method, url, status.as_u16());
        if status.as_u16() > 399 {
            for (name, value) in upstream.headers() {
                tracing::info!("  {}: {}", name, String::from_utf8_lossy(value.as_bytes()));
            }
        }

        let headers = upstream.headers().clone();

        // Dropping the stream, on completion or caller disconnect, releases
        // the upstream connection.
        let body = StreamBody::new(
            upstream
                .bytes_stream()
                .map_ok(Frame::data)
                .map_err(BoxError::from),
        );

        let mut response = Response::new(body.boxed_unsync());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Backend base URL + inbound path, plus the inbound query when present
pub fn upstream_url(base: &str, uri: &Uri) -> String {
    let mut url = format!("{}{}", base.trim_end_matches('/'), uri.path());
    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Parsed form of [`upstream_url`].
///
/// `.` and `..` path segments are resolved during parsing, so
/// `/logs/../_cat/indices` reaches the backend as `/_cat/indices`. Every other
/// byte of the path and query is kept.
pub fn upstream_request_url(base: &str, uri: &Uri) -> Result<reqwest::Url, ProxyError> {
    let url = upstream_url(base, uri);
    reqwest::Url::parse(&url).map_err(|e| ProxyError::InvalidUpstream(format!("{}: {}", url, e)))
}

/// Copy every inbound header except `Host`, then force basic auth
pub fn outbound_headers(
    inbound: &HeaderMap,
    credential: &BackendCredential,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 1);
    for (name, value) in inbound {
        if name == HOST {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(
        AUTHORIZATION,
        basic_auth(&credential.username, &credential.password)?,
    );
    Ok(headers)
}

fn basic_auth(username: &str, password: &str) -> Result<HeaderValue, ProxyError> {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|e| ProxyError::InvalidUpstream(e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

fn error_response(err: &ProxyError) -> Response<ProxyBody> {
    let body = Full::new(Bytes::from(err.to_json().to_string()))
        .map_err(|never| match never {})
        .boxed_unsync();

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
