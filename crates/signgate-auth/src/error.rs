//! Error types for request authentication and credential loading.
//!
//! [`AuthError`] enumerates every reason a request can be rejected. Variants
//! carry detail for server-side logs; the HTTP layer never forwards that detail
//! to callers. [`LoadError`] describes a credential source that could not be
//! turned into a snapshot.

use std::path::PathBuf;

/// Reasons a request fails authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing or cannot be parsed.
    #[error("missing credentials")]
    MissingCredentials,

    /// The identity is not present in the credential store.
    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    /// The `date` header is missing, unparsable, or outside the skew window.
    #[error("stale or future timestamp")]
    StaleTimestamp,

    /// The body does not hash to the value declared in the `digest` header.
    #[error("payload mismatch")]
    PayloadMismatch,

    /// The computed signature does not match the provided one.
    #[error("invalid signature")]
    InvalidSignature,

    /// The signing or digest algorithm is not supported.
    #[error("algorithm unsupported: {0}")]
    UnsupportedAlgorithm(String),

    /// A header value is not valid visible ASCII or has the wrong shape.
    #[error("malformed header value: {0}")]
    MalformedHeader(String),
}

impl AuthError {
    /// Short, stable reason label for structured logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::UnknownIdentity(_) => "unknown_identity",
            Self::StaleTimestamp => "stale_timestamp",
            Self::PayloadMismatch => "payload_mismatch",
            Self::InvalidSignature => "invalid_signature",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::MalformedHeader(_) => "malformed_header",
        }
    }
}

/// A credential source that could not be loaded.
///
/// Messages never include credential values.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The source could not be read.
    #[error("failed to read credential source {}: {source}", .path.display())]
    Read {
        /// The source path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source is not a JSON object mapping identities to secret strings.
    #[error(
        "malformed credential source {} at line {line}, column {column}",
        .path.display()
    )]
    Parse {
        /// The source path.
        path: PathBuf,
        /// 1-based line of the syntax or type error.
        line: usize,
        /// 1-based column of the syntax or type error.
        column: usize,
    },

    /// The source parsed but contains an unusable entry.
    #[error("invalid credential entry in {}: {reason}", .path.display())]
    Invalid {
        /// The source path.
        path: PathBuf,
        /// Why the entry was rejected.
        reason: String,
    },
}
