//! Type-erased body shared by requests and responses.
//!
//! Inbound bodies, buffered bodies, error payloads, and relayed upstream bodies
//! all travel as [`GatewayBody`], so stages do not care where a body came from.

use std::convert::Infallible;
use std::io;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited};
use signgate_core::GatewayError;

/// Type-erased body used throughout the gateway.
pub type GatewayBody = BoxBody<Bytes, io::Error>;

/// Create a [`GatewayBody`] from in-memory bytes.
pub fn full(data: impl Into<Bytes>) -> GatewayBody {
    Full::new(data.into())
        .map_err(|never: Infallible| match never {})
        .boxed()
}

/// Create an empty [`GatewayBody`].
#[must_use]
pub fn empty() -> GatewayBody {
    Empty::<Bytes>::new()
        .map_err(|never: Infallible| match never {})
        .boxed()
}

/// Erase any `Bytes` body, such as `hyper::body::Incoming`.
pub fn boxed<B>(body: B) -> GatewayBody
where
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    body.map_err(io::Error::other).boxed()
}

/// Buffer `body` completely, refusing to read past `limit` bytes.
///
/// # Errors
///
/// Returns a request error when the body exceeds `limit` or cannot be read.
pub async fn collect_limited(body: GatewayBody, limit: usize) -> Result<Bytes, GatewayError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(
            GatewayError::bad_request(format!("request body exceeds {limit} bytes")),
        ),
        Err(err) => Err(GatewayError::bad_request("failed to read request body")
            .with_source(io::Error::other(err))),
    }
}
