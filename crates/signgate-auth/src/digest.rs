//! Body digest computation and validation.
//!
//! The `digest` header has the form `<ALG>=<base64 hash>`, for example
//! `SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=`. The signature covers
//! the header, not the body, so the header must be checked against the body
//! before the signature means anything.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Supported body hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// The token used in the `digest` header.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Hash `body` and return the raw digest.
    #[must_use]
    pub fn hash(&self, body: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(body).to_vec(),
            Self::Sha512 => Sha512::digest(body).to_vec(),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA-256" => Ok(Self::Sha256),
            "SHA-512" => Ok(Self::Sha512),
            _ => Err(AuthError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the `digest` header value for `body`.
///
/// # Examples
///
/// ```
/// use signgate_auth::{DigestAlgorithm, compute_digest};
///
/// assert_eq!(
///     compute_digest(DigestAlgorithm::Sha256, b""),
///     "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
/// );
/// ```
#[must_use]
pub fn compute_digest(algorithm: DigestAlgorithm, body: &[u8]) -> String {
    format!("{algorithm}={}", BASE64.encode(algorithm.hash(body)))
}

/// Check that `header` declares the hash of `body`.
///
/// # Errors
///
/// - [`AuthError::PayloadMismatch`] if the header is empty or the hashes differ
/// - [`AuthError::UnsupportedAlgorithm`] if the declared algorithm is unknown
/// - [`AuthError::MalformedHeader`] if the header is not `<ALG>=<base64>`
pub fn verify_digest(header: &str, body: &[u8]) -> Result<DigestAlgorithm, AuthError> {
    let header = header.trim();
    if header.is_empty() {
        return Err(AuthError::PayloadMismatch);
    }

    let (token, encoded) = header
        .split_once('=')
        .ok_or_else(|| AuthError::MalformedHeader("digest".to_owned()))?;
    let algorithm: DigestAlgorithm = token.parse()?;
    let declared = BASE64
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedHeader("digest".to_owned()))?;

    let actual = algorithm.hash(body);
    if actual.as_slice().ct_eq(declared.as_slice()).into() {
        Ok(algorithm)
    } else {
        Err(AuthError::PayloadMismatch)
    }
}
