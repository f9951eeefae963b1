//! End-to-end tests for SignGate.
//!
//! Each test binds a stub upstream and a gateway on ephemeral loopback ports
//! inside the test process, then drives the gateway over real HTTP with
//! `reqwest`. No external server is needed:
//!
//! ```text
//! cargo test -p signgate-integration
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use signgate_auth::{CredentialStore, RequestSigner};
use signgate_core::GatewayConfig;
use signgate_http::{GatewayService, Pipeline};
use tokio::net::TcpListener;

#[cfg(test)]
mod test_authentication;
#[cfg(test)]
mod test_forwarding;
#[cfg(test)]
mod test_reload;

/// Identity every test signs as.
pub const IDENTITY: &str = "svc-a";

/// Secret for [`IDENTITY`].
pub const SECRET: &str = "s3cr3t";

/// Correlation header used by the gateway under test.
pub const CORRELATION_HEADER: &str = "x-request-identifier";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A stub upstream that echoes request bodies and counts calls.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Address the stub listens on.
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
}

impl Upstream {
    /// Number of requests the stub has received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Start the echo upstream.
///
/// It returns the request body unchanged, plus headers describing what it saw:
/// `x-echo-method`, `x-echo-path`, `x-echo-correlation`, and
/// `x-saw-authorization`.
pub async fn spawn_upstream() -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let svc = service_fn(move |req: http::Request<Incoming>| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(echo(req).await)
                    }
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    Upstream { addr, calls }
}

async fn echo(req: http::Request<Incoming>) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let bytes = body.collect().await.map(|c| c.to_bytes()).unwrap_or_default();
    let correlation = parts
        .headers
        .get(CORRELATION_HEADER)
        .cloned()
        .unwrap_or_else(|| http::HeaderValue::from_static(""));
    let saw_authorization = if parts.headers.contains_key(http::header::AUTHORIZATION) {
        "yes"
    } else {
        "no"
    };

    http::Response::builder()
        .header("x-echo-method", parts.method.as_str())
        .header("x-echo-path", parts.uri.to_string())
        .header("x-echo-correlation", correlation)
        .header("x-saw-authorization", saw_authorization)
        .body(Full::new(bytes))
        .unwrap()
}

/// Default gateway configuration pointed at `upstream`.
#[must_use]
pub fn gateway_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listen = "127.0.0.1:0".to_owned();
    config.upstream.hostname = upstream.ip().to_string();
    config.upstream.port = upstream.port();
    config.upstream.timeout_ms = 2_000;
    config
}

/// Start a gateway for `config` backed by `store`. Returns its base URL.
pub async fn spawn_gateway(config: &GatewayConfig, store: Arc<CredentialStore>) -> String {
    init_tracing();

    let pipeline = Pipeline::from_config(config, store.clone()).unwrap();
    let service = GatewayService::new(pipeline, config).with_credential_status(store);

    let listener = TcpListener::bind(config.listen_addr().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let conn = http
                .serve_connection(TokioIo::new(stream), service.clone())
                .into_owned();
            tokio::spawn(async move {
                let _ = conn.await;
            });
        }
    });

    format!("http://{addr}")
}

/// A credential store holding only [`IDENTITY`].
#[must_use]
pub fn default_store() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::from_credentials([(IDENTITY, SECRET)]))
}

/// Sign a request for `method base_url+path` with `body` as [`IDENTITY`].
///
/// Returns the signed headers, ready to attach to a `reqwest` request.
#[must_use]
pub fn sign(method: &str, url: &str, body: &[u8]) -> http::HeaderMap {
    sign_as(IDENTITY, SECRET, method, url, body)
}

/// Sign a request with explicit credentials.
#[must_use]
pub fn sign_as(
    identity: &str,
    secret: &str,
    method: &str,
    url: &str,
    body: &[u8],
) -> http::HeaderMap {
    let (mut parts, ()) = http::Request::builder()
        .method(method)
        .uri(url)
        .body(())
        .unwrap()
        .into_parts();
    RequestSigner::new(identity, secret)
        .sign(&mut parts, body, Utc::now())
        .unwrap();
    parts.headers
}

/// A plain `reqwest` client.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
