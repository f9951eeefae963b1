//! Error types for SignGate.
//!
//! Every stage converts its internal faults into a [`GatewayError`] before it
//! reaches the terminal handler, which is the only place that renders one to
//! the wire as an [`ErrorBody`].

use std::collections::BTreeMap;
use std::fmt;

/// Category of a gateway error. Each category maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed inbound request.
    Request,
    /// Failed authentication.
    Authorization,
    /// No stage produced a response.
    NotFound,
    /// Upstream connection or protocol failure.
    Upstream,
    /// Upstream or request deadline exceeded.
    GatewayTimeout,
    /// Unexpected fault inside the gateway.
    Internal,
}

impl ErrorKind {
    /// Returns the short kind name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "RequestError",
            Self::Authorization => "AuthorizationError",
            Self::NotFound => "NotFoundError",
            Self::Upstream | Self::GatewayTimeout => "UpstreamError",
            Self::Internal => "InternalError",
        }
    }

    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::Request => http::StatusCode::BAD_REQUEST,
            Self::Authorization => http::StatusCode::UNAUTHORIZED,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::Upstream => http::StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => http::StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that terminates the request pipeline.
#[derive(Debug)]
pub struct GatewayError {
    /// The error category.
    pub kind: ErrorKind,
    /// Human-readable message exposed to the caller.
    pub message: String,
    /// Contextual key/value pairs exposed to the caller. Never secret material.
    pub metadata: BTreeMap<String, String>,
    /// The underlying source error, logged server-side only.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl GatewayError {
    /// Create a new error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            metadata: BTreeMap::new(),
            source: None,
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach request method and path as metadata.
    #[must_use]
    pub fn with_request(self, method: &http::Method, path: &str) -> Self {
        self.with_metadata("method", method.as_str())
            .with_metadata("path", path)
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        self.kind.status_code()
    }

    /// The uppercased canonical status phrase, e.g. `BAD_GATEWAY`.
    #[must_use]
    pub fn name(&self) -> String {
        self.status_code()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_uppercase()
            .replace(' ', "_")
    }

    /// Build the serializable wire body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.status_code().as_u16(),
            name: self.name(),
            message: self.message.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Serialize the wire body to JSON bytes.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_body()).expect("JSON serialization of error cannot fail")
    }

    // -- Convenience constructors --

    /// A malformed inbound request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request, message)
    }

    /// A failed authentication. The message never reveals which check failed.
    #[must_use]
    pub fn unauthorized(method: &http::Method, path: &str) -> Self {
        Self::new(ErrorKind::Authorization, "request could not be authenticated")
            .with_request(method, path)
    }

    /// No stage produced a response for the request.
    #[must_use]
    pub fn not_found(method: &http::Method, path: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("no handler for {method} {path}"))
            .with_request(method, path)
    }

    /// The upstream could not be reached or returned a protocol error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    /// The upstream or request deadline expired.
    #[must_use]
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GatewayTimeout, message)
    }

    /// An unexpected internal fault.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Convenience result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// JSON error body returned to callers.
///
/// ```json
/// {"code": 401, "name": "UNAUTHORIZED", "message": "...", "metadata": {"method": "POST", "path": "/widgets"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub code: u16,
    /// Uppercased status phrase.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Contextual key/value pairs.
    pub metadata: BTreeMap<String, String>,
}

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration key holds a value that cannot be used.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// The configuration key (environment variable name).
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create an [`ConfigError::Invalid`].
    #[must_use]
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
