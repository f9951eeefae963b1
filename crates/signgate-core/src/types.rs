//! Per-request markers shared across stages.

use std::fmt;

use chrono::{DateTime, Utc};

/// Opaque identifier threading one logical request through the gateway and upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap a caller-supplied identifier. Returns `None` for empty or blank values.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Generate a fresh random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker attached to a request once its signature has been verified.
///
/// Its presence is the only thing the forwarding stage checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    /// The identity that signed the request.
    pub identity: String,
    /// When verification completed.
    pub verified_at: DateTime<Utc>,
}

impl AuthenticatedIdentity {
    /// Mark `identity` as verified now.
    #[must_use]
    pub fn now(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            verified_at: Utc::now(),
        }
    }
}
