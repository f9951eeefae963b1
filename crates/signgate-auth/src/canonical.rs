//! Canonical string construction.
//!
//! The canonical string is the exact HMAC input. It is a newline-separated
//! concatenation in a fixed order:
//!
//! ```text
//! METHOD\n
//! path?query\n
//! date:<value>\n
//! host:<value>\n
//! digest:<value>
//! ```
//!
//! A header missing from the request contributes an empty value, so signer and
//! verifier always process the same number of fields.

use crate::error::AuthError;

/// Header names covered by the signature, in canonical order.
pub const SIGNED_HEADERS: [&str; 3] = ["date", "host", "digest"];

/// The request attributes that participate in a signature.
///
/// The field set is closed: adding a signed attribute means adding a field here,
/// so a signer cannot silently cover fewer fields than the verifier expects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SigningContext {
    /// HTTP method.
    pub method: String,
    /// Request path including the query string.
    pub path: String,
    /// Value of the `date` header.
    pub date: String,
    /// Value of the `host` header.
    pub host: String,
    /// Value of the `digest` header.
    pub digest: String,
}

impl SigningContext {
    /// Build a context from request parts.
    ///
    /// `host` falls back to the URI authority when no `Host` header is present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedHeader`] if a signed header is not visible ASCII.
    pub fn from_parts(parts: &http::request::Parts) -> Result<Self, AuthError> {
        let path = parts
            .uri
            .path_and_query()
            .map_or("/", http::uri::PathAndQuery::as_str)
            .to_owned();

        let mut host = header_value(&parts.headers, "host")?;
        if host.is_empty() {
            if let Some(authority) = parts.uri.authority() {
                host = authority.as_str().to_owned();
            }
        }

        Ok(Self {
            method: parts.method.as_str().to_owned(),
            path,
            date: header_value(&parts.headers, "date")?,
            host,
            digest: header_value(&parts.headers, "digest")?,
        })
    }

    /// The value of a signed header by canonical name.
    fn signed_header(&self, name: &str) -> &str {
        match name {
            "date" => &self.date,
            "host" => &self.host,
            "digest" => &self.digest,
            _ => "",
        }
    }

    /// Build the canonical string.
    ///
    /// # Examples
    ///
    /// ```
    /// use signgate_auth::SigningContext;
    ///
    /// let ctx = SigningContext {
    ///     method: "post".to_owned(),
    ///     path: "/widgets?x=1".to_owned(),
    ///     date: "Tue, 15 Nov 1994 08:12:31 GMT".to_owned(),
    ///     host: "api.example.com".to_owned(),
    ///     digest: String::new(),
    /// };
    /// assert_eq!(
    ///     ctx.canonicalize(),
    ///     "POST\n/widgets?x=1\ndate:Tue, 15 Nov 1994 08:12:31 GMT\nhost:api.example.com\ndigest:"
    /// );
    /// ```
    #[must_use]
    pub fn canonicalize(&self) -> String {
        let mut lines = Vec::with_capacity(2 + SIGNED_HEADERS.len());
        lines.push(self.method.to_ascii_uppercase());
        lines.push(self.path.clone());
        for name in SIGNED_HEADERS {
            lines.push(format!("{name}:{}", self.signed_header(name).trim()));
        }
        lines.join("\n")
    }
}

/// Read a header as a string, treating absence as empty.
fn header_value(headers: &http::HeaderMap, name: &str) -> Result<String, AuthError> {
    headers.get(name).map_or_else(
        || Ok(String::new()),
        |v| {
            v.to_str()
                .map(ToOwned::to_owned)
                .map_err(|_| AuthError::MalformedHeader(name.to_owned()))
        },
    )
}
