//! Response construction helpers.
//!
//! [`error_to_response`] is the terminal error handler: the only place a
//! [`GatewayError`] is rendered to the wire and the place its detail is logged.

use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use signgate_core::{CorrelationId, GatewayError};
use tracing::{debug, error};

use crate::body::{self, GatewayBody};

/// Content type of every gateway-generated body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Render a [`GatewayError`] as a JSON error response.
///
/// Server faults (5xx) are logged at `error` with their source chain. Client
/// errors are logged at `debug`, since the stage that raised them already
/// logged the reason.
pub fn error_to_response(
    err: &GatewayError,
    correlation_id: Option<&CorrelationId>,
) -> http::Response<GatewayBody> {
    let status = err.status_code();
    let correlation_id = correlation_id.map(CorrelationId::as_str);

    if status.is_server_error() {
        error!(
            kind = %err.kind,
            status = status.as_u16(),
            message = %err.message,
            source = err.source.as_ref().map(tracing::field::display),
            correlation_id,
            "request failed"
        );
    } else {
        debug!(
            kind = %err.kind,
            status = status.as_u16(),
            message = %err.message,
            correlation_id,
            "request refused"
        );
    }

    json_response(status, err.to_json())
}

/// Build a JSON response with the given status.
pub fn json_response(status: http::StatusCode, json: Vec<u8>) -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
        .body(body::full(json))
        .expect("valid JSON response")
}

/// Set the correlation header on a response, replacing any upstream value.
pub fn set_correlation_header<B>(
    response: &mut http::Response<B>,
    header: &HeaderName,
    correlation_id: &CorrelationId,
) {
    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(header.clone(), value);
    }
}
