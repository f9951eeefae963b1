//! Ordered stage execution.
//!
//! Stages run in registration order. The first stage to respond ends the
//! pipeline; a stage error goes straight to the terminal handler; a request
//! that every stage passes along ends in `404`.

use std::fmt;
use std::sync::Arc;

use http::header::HeaderName;
use signgate_auth::{CredentialProvider, RequestVerifier, SigningAlgorithm};
use signgate_core::{ConfigError, CorrelationId, GatewayConfig, GatewayError};
use tracing::debug;

use crate::auth::AuthenticationStage;
use crate::body::GatewayBody;
use crate::correlation::CorrelationStage;
use crate::forward::ForwardingStage;
use crate::response::{error_to_response, set_correlation_header};
use crate::stage::{GatewayRequest, Stage, StageOutcome};

/// The request pipeline, built once at startup.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    correlation_header: Option<HeaderName>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("correlation_header", &self.correlation_header)
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline from explicit stages.
    ///
    /// When `correlation_header` is set, the correlation id recorded on the
    /// request is echoed under that header on every response.
    #[must_use]
    pub fn new(stages: Vec<Box<dyn Stage>>, correlation_header: Option<HeaderName>) -> Self {
        Self {
            stages,
            correlation_header,
        }
    }

    /// Build the standard pipeline: correlation (if enabled), authentication,
    /// forwarding.
    pub fn from_config(
        config: &GatewayConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ConfigError> {
        let algorithm: SigningAlgorithm = config
            .signing
            .algorithm
            .parse()
            .map_err(|e| ConfigError::invalid("SIGNING_ALGORITHM", format!("{e}")))?;

        let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(3);
        let mut correlation_header = None;

        if config.correlation.enable {
            let stage = CorrelationStage::from_name(&config.correlation.header)?;
            correlation_header = Some(stage.header().clone());
            stages.push(Box::new(stage));
        }

        stages.push(Box::new(AuthenticationStage::new(
            RequestVerifier::new(algorithm, &config.signing.scheme, config.signing.skew_millis),
            credentials,
            config.max_body_bytes,
        )));
        stages.push(Box::new(ForwardingStage::new(&config.upstream)));

        Ok(Self::new(stages, correlation_header))
    }

    /// Names of the registered stages, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// The header correlation ids are echoed under, if correlation is enabled.
    #[must_use]
    pub fn correlation_header(&self) -> Option<&HeaderName> {
        self.correlation_header.as_ref()
    }

    /// Run `request` through every stage and produce the final response.
    pub async fn handle(&self, request: GatewayRequest) -> http::Response<GatewayBody> {
        let method = request.method().clone();
        let path = request.path().to_owned();
        let mut correlation_id = request.correlation_id.clone();
        let mut request = request;

        let mut response = 'run: {
            for stage in &self.stages {
                match stage.handle(request).await {
                    Ok(StageOutcome::Continue(next)) => {
                        correlation_id.clone_from(&next.correlation_id);
                        request = next;
                    }
                    Ok(StageOutcome::Respond(response)) => {
                        debug!(
                            stage = stage.name(),
                            status = response.status().as_u16(),
                            "stage responded"
                        );
                        break 'run response;
                    }
                    Err(err) => {
                        debug!(stage = stage.name(), kind = %err.kind, "stage failed");
                        break 'run error_to_response(&err, correlation_id.as_ref());
                    }
                }
            }
            error_to_response(
                &GatewayError::not_found(&method, &path),
                correlation_id.as_ref(),
            )
        };

        self.echo_correlation(&mut response, correlation_id.as_ref());
        response
    }

    fn echo_correlation(
        &self,
        response: &mut http::Response<GatewayBody>,
        correlation_id: Option<&CorrelationId>,
    ) {
        if let (Some(header), Some(id)) = (&self.correlation_header, correlation_id) {
            set_correlation_header(response, header, id);
        }
    }
}
