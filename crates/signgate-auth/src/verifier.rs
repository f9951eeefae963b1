//! Server-side request verification.
//!
//! Verification runs in a fixed order, and the first failure wins:
//!
//! 1. Parse the `Authorization` header.
//! 2. Look up the identity's secret.
//! 3. Check the `date` header against the skew window.
//! 4. Check the `digest` header against the buffered body.
//! 5. Recompute and compare the signature.
//!
//! Steps 1 to 3 need only the request head. [`RequestVerifier::check_headers`]
//! runs them and returns a [`PendingVerification`], which finishes with
//! [`PendingVerification::verify_body`].
//!
//! A caller that buffers the body between steps 1 and 2 can split the head
//! checks with [`RequestVerifier::authorize`] and [`RequestVerifier::resolve`].
//! That way a body failure looks the same whether or not the identity exists.

use chrono::{DateTime, Utc};
use signgate_core::AuthenticatedIdentity;

use crate::authorization::Authorization;
use crate::canonical::SigningContext;
use crate::credentials::{CredentialProvider, Secret};
use crate::digest::verify_digest;
use crate::error::AuthError;
use crate::signature::{SigningAlgorithm, verify};
use crate::timestamp::check_date_header;

/// Verifies signed requests against a credential provider.
#[derive(Debug, Clone)]
pub struct RequestVerifier {
    algorithm: SigningAlgorithm,
    scheme: String,
    skew_millis: u64,
}

impl RequestVerifier {
    /// Create a verifier for one algorithm, authorization scheme, and skew window.
    pub fn new(algorithm: SigningAlgorithm, scheme: impl Into<String>, skew_millis: u64) -> Self {
        Self {
            algorithm,
            scheme: scheme.into(),
            skew_millis,
        }
    }

    /// The configured signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// The expected `Authorization` scheme token.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Run the header-only checks: authorization, identity lookup, and freshness.
    ///
    /// The secret is resolved here, so a reload between this call and
    /// [`PendingVerification::verify_body`] does not change the outcome.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredentials`] for a missing or malformed `Authorization`
    /// - [`AuthError::UnknownIdentity`] if the provider has no secret for the identity
    /// - [`AuthError::StaleTimestamp`] for a missing, unparsable, or out-of-window `date`
    pub fn check_headers(
        &self,
        parts: &http::request::Parts,
        credentials: &dyn CredentialProvider,
        now: DateTime<Utc>,
    ) -> Result<PendingVerification, AuthError> {
        let authorization = self.authorize(parts)?;
        self.resolve(authorization, parts, credentials, now)
    }

    /// Parse the `Authorization` header without consulting any credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] for a missing or malformed header.
    pub fn authorize(&self, parts: &http::request::Parts) -> Result<Authorization, AuthError> {
        Authorization::from_headers(&parts.headers, &self.scheme)
    }

    /// Look up the secret for a parsed `authorization` and check freshness.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnknownIdentity`] if the provider has no secret for the identity
    /// - [`AuthError::StaleTimestamp`] for a missing, unparsable, or out-of-window `date`
    pub fn resolve(
        &self,
        authorization: Authorization,
        parts: &http::request::Parts,
        credentials: &dyn CredentialProvider,
        now: DateTime<Utc>,
    ) -> Result<PendingVerification, AuthError> {
        let secret = credentials
            .get_secret(&authorization.identity)
            .ok_or_else(|| AuthError::UnknownIdentity(authorization.identity.clone()))?;

        let date = parts
            .headers
            .get(http::header::DATE)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::StaleTimestamp)?;
        check_date_header(date, now, self.skew_millis)?;

        Ok(PendingVerification {
            authorization,
            secret,
            algorithm: self.algorithm,
        })
    }

    /// Run every check against a fully buffered request.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] encountered, in the order listed on the
    /// module documentation.
    pub fn verify(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        credentials: &dyn CredentialProvider,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        self.check_headers(parts, credentials, now)?
            .verify_body(parts, body)
    }
}

/// A request whose header checks passed, waiting for its body.
#[derive(Debug)]
pub struct PendingVerification {
    authorization: Authorization,
    secret: Secret,
    algorithm: SigningAlgorithm,
}

impl PendingVerification {
    /// The identity claimed by the request. Not yet proven.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.authorization.identity
    }

    /// Check the body digest, then the signature.
    ///
    /// # Errors
    ///
    /// - [`AuthError::PayloadMismatch`] if the `digest` header is missing or does not match
    /// - [`AuthError::UnsupportedAlgorithm`] or [`AuthError::MalformedHeader`] for a bad `digest`
    /// - [`AuthError::InvalidSignature`] if the recomputed signature differs
    pub fn verify_body(
        self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let digest = match parts.headers.get("digest") {
            Some(value) => value
                .to_str()
                .map_err(|_| AuthError::MalformedHeader("digest".to_owned()))?,
            None => return Err(AuthError::PayloadMismatch),
        };
        verify_digest(digest, body)?;

        let context = SigningContext::from_parts(parts)?;
        if !verify(
            &context,
            &self.secret,
            self.algorithm,
            &self.authorization.signature,
        ) {
            return Err(AuthError::InvalidSignature);
        }

        Ok(AuthenticatedIdentity::now(self.authorization.identity))
    }
}
