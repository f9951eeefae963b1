//! The stage abstraction and the request it operates on.

use std::fmt;

use async_trait::async_trait;
use signgate_core::{AuthenticatedIdentity, CorrelationId, GatewayError};

use crate::body::{self, GatewayBody};

/// An inbound request plus the markers earlier stages attached to it.
pub struct GatewayRequest {
    /// Method, URI, headers, and extensions.
    pub parts: http::request::Parts,
    /// The request body. Replaced with a buffered copy after authentication.
    pub body: GatewayBody,
    /// Set by the correlation stage.
    pub correlation_id: Option<CorrelationId>,
    /// Set by the authentication stage once the signature checks out.
    pub identity: Option<AuthenticatedIdentity>,
}

impl GatewayRequest {
    /// Wrap an HTTP request with no markers attached.
    pub fn new(request: http::Request<GatewayBody>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            correlation_id: None,
            identity: None,
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    /// The request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Take the body, leaving an empty one in its place.
    pub fn take_body(&mut self) -> GatewayBody {
        std::mem::replace(&mut self.body, body::empty())
    }
}

impl fmt::Debug for GatewayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRequest")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("correlation_id", &self.correlation_id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// What a stage decided to do with a request.
#[derive(Debug)]
pub enum StageOutcome {
    /// Hand the (possibly modified) request to the next stage.
    Continue(GatewayRequest),
    /// Stop the pipeline and send this response.
    Respond(http::Response<GatewayBody>),
}

/// One step of the request pipeline.
///
/// Stages are built once at startup and shared by every request, so they must
/// not hold per-request state.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Process a request.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] to abort the pipeline. The terminal handler
    /// renders it; the stage is responsible for logging any detail it hides.
    async fn handle(&self, request: GatewayRequest) -> Result<StageOutcome, GatewayError>;
}
