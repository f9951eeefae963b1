//! `Authorization` header parsing and formatting.
//!
//! Format:
//!
//! ```text
//! <SCHEME> <identity>:<base64 signature>
//! ```
//!
//! The scheme is compared case-insensitively. Identities cannot contain `:`,
//! so the header splits at the first colon.

use crate::error::AuthError;

/// Parsed components of an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// The identity claiming to have signed the request.
    pub identity: String,
    /// The base64 signature supplied by the caller.
    pub signature: String,
}

impl Authorization {
    /// Parse an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if the scheme does not match or the
    /// credentials part is not `identity:signature` with both sides non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use signgate_auth::Authorization;
    ///
    /// let auth = Authorization::parse("HMAC svc-a:c2lnbmF0dXJl", "HMAC").unwrap();
    /// assert_eq!(auth.identity, "svc-a");
    /// assert_eq!(auth.signature, "c2lnbmF0dXJl");
    /// ```
    pub fn parse(value: &str, scheme: &str) -> Result<Self, AuthError> {
        let (provided_scheme, credentials) = value
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MissingCredentials)?;

        if !provided_scheme.eq_ignore_ascii_case(scheme) {
            return Err(AuthError::MissingCredentials);
        }

        let (identity, signature) = credentials
            .trim()
            .split_once(':')
            .ok_or(AuthError::MissingCredentials)?;

        if identity.is_empty() || signature.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        Ok(Self {
            identity: identity.to_owned(),
            signature: signature.to_owned(),
        })
    }

    /// Extract and parse the `Authorization` header from request headers.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if the header is absent, not
    /// visible ASCII, or malformed.
    pub fn from_headers(headers: &http::HeaderMap, scheme: &str) -> Result<Self, AuthError> {
        let value = headers
            .get(http::header::AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MissingCredentials)?;
        Self::parse(value, scheme)
    }

    /// Render the header value for `scheme`.
    #[must_use]
    pub fn to_header_value(&self, scheme: &str) -> String {
        format!("{scheme} {}:{}", self.identity, self.signature)
    }
}
