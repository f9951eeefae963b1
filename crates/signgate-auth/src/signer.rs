//! Client-side request signing.
//!
//! [`RequestSigner`] adds the `host`, `date`, `digest`, and `authorization`
//! headers a verifier expects. Callers and tests use it to produce requests
//! the gateway accepts.

use chrono::{DateTime, Utc};
use http::HeaderValue;
use http::header::{AUTHORIZATION, DATE, HOST};

use crate::authorization::Authorization;
use crate::canonical::SigningContext;
use crate::credentials::Secret;
use crate::digest::{DigestAlgorithm, compute_digest};
use crate::error::AuthError;
use crate::signature::{Signature, SigningAlgorithm, sign};
use crate::timestamp::format_http_date;

/// Default `Authorization` scheme token.
pub const DEFAULT_SCHEME: &str = "HMAC";

/// Signs outgoing requests for one identity.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    identity: String,
    secret: Secret,
    algorithm: SigningAlgorithm,
    digest_algorithm: DigestAlgorithm,
    scheme: String,
}

impl RequestSigner {
    /// Create a signer using HMAC-SHA256, a SHA-256 digest, and the `HMAC` scheme.
    pub fn new(identity: impl Into<String>, secret: impl Into<Secret>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
            algorithm: SigningAlgorithm::default(),
            digest_algorithm: DigestAlgorithm::default(),
            scheme: DEFAULT_SCHEME.to_owned(),
        }
    }

    /// Use a different signing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Use a different body digest algorithm.
    #[must_use]
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Use a different `Authorization` scheme token.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sign the request in place.
    ///
    /// Sets `date` to `now` and `digest` to the hash of `body`, copies the URI
    /// authority into `host` when the header is absent, then sets `authorization`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedHeader`] if a header value cannot be
    /// represented, for example an identity with non-visible characters.
    pub fn sign(
        &self,
        parts: &mut http::request::Parts,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Signature, AuthError> {
        if !parts.headers.contains_key(HOST) {
            if let Some(authority) = parts.uri.authority() {
                parts
                    .headers
                    .insert(HOST, header_value("host", authority.as_str())?);
            }
        }
        parts
            .headers
            .insert(DATE, header_value("date", &format_http_date(now))?);
        parts.headers.insert(
            "digest",
            header_value("digest", &compute_digest(self.digest_algorithm, body))?,
        );

        let context = SigningContext::from_parts(parts)?;
        let signature = sign(&context, &self.secret, self.algorithm);

        let authorization = Authorization {
            identity: self.identity.clone(),
            signature: signature.value.clone(),
        };
        parts.headers.insert(
            AUTHORIZATION,
            header_value(
                "authorization",
                &authorization.to_header_value(&self.scheme),
            )?,
        );

        Ok(signature)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|_| AuthError::MalformedHeader(name.to_owned()))
}
