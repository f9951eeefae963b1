//! Authentication stage.
//!
//! Parses the `Authorization` header, buffers the body, then looks up the
//! identity and checks freshness, digest, and signature. A verified request
//! continues with the buffered body and an [`AuthenticatedIdentity`].
//!
//! The body is buffered before the identity lookup, so an oversized or broken
//! body gets the same `400` whether the claimed identity exists or not. Every
//! credential rejection becomes the same 401 on the wire; the specific reason
//! is only ever logged.
//!
//! [`AuthenticatedIdentity`]: signgate_core::AuthenticatedIdentity

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use signgate_auth::{AuthError, CredentialProvider, RequestVerifier};
use signgate_core::GatewayError;
use tracing::{debug, warn};

use crate::body;
use crate::stage::{GatewayRequest, Stage, StageOutcome};

/// Verifies the signature and body digest of every request.
pub struct AuthenticationStage {
    verifier: RequestVerifier,
    credentials: Arc<dyn CredentialProvider>,
    max_body_bytes: usize,
}

impl std::fmt::Debug for AuthenticationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationStage")
            .field("verifier", &self.verifier)
            .field("credentials", &"...")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl AuthenticationStage {
    /// Create a stage that verifies against `credentials`.
    #[must_use]
    pub fn new(
        verifier: RequestVerifier,
        credentials: Arc<dyn CredentialProvider>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            verifier,
            credentials,
            max_body_bytes,
        }
    }

    fn reject(request: &GatewayRequest, identity: Option<&str>, err: &AuthError) -> GatewayError {
        warn!(
            reason = err.reason(),
            detail = %err,
            identity,
            correlation_id = request.correlation_id.as_ref().map(|id| id.as_str()),
            method = %request.method(),
            path = request.path(),
            "request rejected"
        );
        GatewayError::unauthorized(request.method(), request.path())
    }
}

#[async_trait]
impl Stage for AuthenticationStage {
    fn name(&self) -> &'static str {
        "authentication"
    }

    async fn handle(&self, mut request: GatewayRequest) -> Result<StageOutcome, GatewayError> {
        let authorization = match self.verifier.authorize(&request.parts) {
            Ok(authorization) => authorization,
            Err(err) => return Err(Self::reject(&request, None, &err)),
        };
        let claimed = authorization.identity.clone();

        let collected = body::collect_limited(request.take_body(), self.max_body_bytes).await;
        let buffered = match collected {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    identity = %claimed,
                    correlation_id = request.correlation_id.as_ref().map(|id| id.as_str()),
                    error = %err,
                    "failed to buffer request body"
                );
                return Err(err.with_request(request.method(), request.path()));
            }
        };

        let resolved = self.verifier.resolve(
            authorization,
            &request.parts,
            self.credentials.as_ref(),
            Utc::now(),
        );
        let pending = match resolved {
            Ok(pending) => pending,
            Err(err) => return Err(Self::reject(&request, Some(&claimed), &err)),
        };

        match pending.verify_body(&request.parts, &buffered) {
            Ok(identity) => {
                debug!(
                    identity = %identity.identity,
                    correlation_id = request.correlation_id.as_ref().map(|id| id.as_str()),
                    "request authenticated"
                );
                request.identity = Some(identity);
                request.body = body::full(buffered);
                Ok(StageOutcome::Continue(request))
            }
            Err(err) => Err(Self::reject(&request, Some(&claimed), &err)),
        }
    }
}
