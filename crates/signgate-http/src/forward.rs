//! Forwarding stage.
//!
//! Relays an authenticated request to the single configured upstream over
//! plain HTTP/1.1 and returns the upstream response as-is, minus hop-by-hop
//! headers. Credentials (`authorization`, `digest`) never leave the gateway.
//! There are no retries.

use std::time::Duration;

use async_trait::async_trait;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use signgate_core::{GatewayError, UpstreamConfig};
use tracing::{debug, error};

use crate::body::{self, GatewayBody};
use crate::stage::{GatewayRequest, Stage, StageOutcome};

/// Hop-by-hop headers, never forwarded in either direction.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Relays verified requests to the upstream.
#[derive(Debug, Clone)]
pub struct ForwardingStage {
    client: Client<HttpConnector, GatewayBody>,
    authority: String,
    timeout: Duration,
}

impl ForwardingStage {
    /// Create a stage for the given upstream. The connection pool is shared by
    /// every request this stage forwards.
    #[must_use]
    pub fn new(upstream: &UpstreamConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            authority: upstream.authority(),
            timeout: upstream.timeout(),
        }
    }

    /// The `host:port` requests are sent to.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    fn outbound_uri(&self, uri: &http::Uri) -> Result<http::Uri, GatewayError> {
        let path_and_query = uri.path_and_query().map_or("/", http::uri::PathAndQuery::as_str);
        format!("http://{}{path_and_query}", self.authority)
            .parse()
            .map_err(|e| GatewayError::internal("failed to build upstream URI").with_source(e))
    }
}

#[async_trait]
impl Stage for ForwardingStage {
    fn name(&self) -> &'static str {
        "forwarding"
    }

    async fn handle(&self, request: GatewayRequest) -> Result<StageOutcome, GatewayError> {
        let Some(identity) = &request.identity else {
            error!(
                method = %request.method(),
                path = request.path(),
                correlation_id = request.correlation_id.as_ref().map(|id| id.as_str()),
                "refusing to forward unauthenticated request"
            );
            return Err(GatewayError::unauthorized(request.method(), request.path()));
        };

        let method = request.method().clone();
        let path = request.path().to_owned();
        debug!(
            %method,
            path,
            identity = %identity.identity,
            upstream = %self.authority,
            "forwarding request"
        );

        let mut parts = request.parts;
        parts.uri = self.outbound_uri(&parts.uri)?;
        parts.version = http::Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::AUTHORIZATION);
        parts.headers.remove("digest");
        let host = HeaderValue::from_str(&self.authority)
            .map_err(|e| GatewayError::internal("invalid upstream authority").with_source(e))?;
        parts.headers.insert(header::HOST, host);

        let outbound = http::Request::from_parts(parts, request.body);
        let sent = tokio::time::timeout(self.timeout, self.client.request(outbound)).await;
        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(GatewayError::bad_gateway("upstream request failed")
                    .with_request(&method, &path)
                    .with_source(e));
            }
            Err(_) => {
                return Err(GatewayError::gateway_timeout("upstream did not respond in time")
                    .with_request(&method, &path));
            }
        };

        let (mut parts, incoming) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        debug!(%method, path, status = parts.status.as_u16(), "upstream responded");

        Ok(StageOutcome::Respond(http::Response::from_parts(
            parts,
            body::boxed(incoming),
        )))
    }
}

/// Remove hop-by-hop headers, including any the `Connection` header names.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in &named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
