//! The hyper `Service` entry point.
//!
//! [`GatewayService`] is cloned into every connection. Per request it:
//!
//! 1. Answers the health endpoint without touching the pipeline
//! 2. Wraps the body and runs the [`Pipeline`] under the request deadline
//! 3. Renders `504` if the deadline expires, dropping the in-flight pipeline

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::service::Service;
use signgate_auth::CredentialStore;
use signgate_core::{CorrelationId, GatewayConfig, GatewayError};
use tracing::{info, warn};

use crate::body::{self, GatewayBody};
use crate::pipeline::Pipeline;
use crate::response::{error_to_response, json_response, set_correlation_header};
use crate::stage::GatewayRequest;

/// Hyper service running every request through the gateway pipeline.
#[derive(Debug, Clone)]
pub struct GatewayService {
    pipeline: Arc<Pipeline>,
    health_path: Option<Arc<str>>,
    credentials: Option<Arc<CredentialStore>>,
    request_timeout: Duration,
}

impl GatewayService {
    /// Create a service for `pipeline` using the deadline and health path from `config`.
    #[must_use]
    pub fn new(pipeline: Pipeline, config: &GatewayConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            health_path: config.health_path.as_deref().map(Arc::from),
            credentials: None,
            request_timeout: config.request_timeout(),
        }
    }

    /// Report this store's status on the health endpoint.
    #[must_use]
    pub fn with_credential_status(mut self, store: Arc<CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Handle one request.
    pub async fn handle(
        &self,
        request: http::Request<GatewayBody>,
    ) -> http::Response<GatewayBody> {
        if self.is_health_check(request.method(), request.uri().path()) {
            return self.health_check_response();
        }

        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        info!(%method, path, "handling request");

        // Only a caller-supplied id survives a deadline expiry, since a
        // generated one lives inside the dropped pipeline future.
        let supplied_id = self.pipeline.correlation_header().and_then(|header| {
            request
                .headers()
                .get(header)
                .and_then(|v| v.to_str().ok())
                .and_then(CorrelationId::new)
        });

        let run = self.pipeline.handle(GatewayRequest::new(request));
        match tokio::time::timeout(self.request_timeout, run).await {
            Ok(response) => {
                let status = response.status().as_u16();
                info!(%method, path, status, "request completed");
                response
            }
            Err(_) => {
                let timeout_ms =
                    u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(%method, path, timeout_ms, "request deadline exceeded");
                let err = GatewayError::gateway_timeout("request deadline exceeded")
                    .with_request(&method, &path);
                let mut response = error_to_response(&err, supplied_id.as_ref());
                let header = self.pipeline.correlation_header();
                if let (Some(header), Some(id)) = (header, &supplied_id) {
                    set_correlation_header(&mut response, header, id);
                }
                response
            }
        }
    }

    fn is_health_check(&self, method: &http::Method, path: &str) -> bool {
        *method == http::Method::GET && self.health_path.as_deref() == Some(path)
    }

    fn health_check_response(&self) -> http::Response<GatewayBody> {
        // Unauthenticated callers see counts only. Paths and load errors stay in the logs.
        let credentials = self.credentials.as_ref().map(|store| {
            let status = store.status();
            serde_json::json!({
                "identities": status.identities,
                "lastLoadedAt": status.last_loaded_at,
                "reloadFailing": status.last_load_error.is_some(),
            })
        });
        let body = serde_json::json!({
            "status": "running",
            "credentials": credentials,
        });
        json_response(http::StatusCode::OK, body.to_string().into_bytes())
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let svc = self.clone();
        Box::pin(async move { Ok(svc.handle(req.map(body::boxed)).await) })
    }
}
