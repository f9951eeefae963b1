//! Correlation identifier propagation.
//!
//! A caller-supplied identifier is passed through untouched. Otherwise a UUID
//! v4 is generated and written into the request headers, so the upstream sees
//! it exactly as if the caller had sent it.

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use signgate_core::{ConfigError, CorrelationId, GatewayError};
use tracing::debug;

use crate::stage::{GatewayRequest, Stage, StageOutcome};

/// Propagates or generates the correlation identifier.
#[derive(Debug, Clone)]
pub struct CorrelationStage {
    header: HeaderName,
}

impl CorrelationStage {
    /// Create a stage reading and writing `header`.
    #[must_use]
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    /// Create a stage from a header name string.
    pub fn from_name(header: &str) -> Result<Self, ConfigError> {
        HeaderName::from_bytes(header.as_bytes())
            .map(Self::new)
            .map_err(|_| {
                ConfigError::invalid(
                    "CORRELATION_HEADER",
                    format!("`{header}` is not a valid header name"),
                )
            })
    }

    /// The header this stage manages.
    #[must_use]
    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

#[async_trait]
impl Stage for CorrelationStage {
    fn name(&self) -> &'static str {
        "correlation"
    }

    async fn handle(&self, mut request: GatewayRequest) -> Result<StageOutcome, GatewayError> {
        let supplied = request
            .parts
            .headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .and_then(CorrelationId::new);

        let id = if let Some(id) = supplied {
            id
        } else {
            let id = CorrelationId::generate();
            let value = HeaderValue::from_str(id.as_str()).map_err(|e| {
                GatewayError::internal("generated correlation id is not a header value")
                    .with_source(e)
            })?;
            request.parts.headers.insert(self.header.clone(), value);
            debug!(correlation_id = %id, "generated correlation id");
            id
        };

        request.correlation_id = Some(id);
        Ok(StageOutcome::Continue(request))
    }
}
