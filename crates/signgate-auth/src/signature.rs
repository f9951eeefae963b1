//! HMAC signature computation and verification.
//!
//! Both functions are pure: no I/O, no state. [`verify`] compares raw MAC
//! bytes with [`subtle::ConstantTimeEq`] so the time taken does not depend on
//! where the first differing byte is.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::canonical::SigningContext;
use crate::credentials::Secret;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Supported HMAC algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    HmacSha256,
    /// HMAC with SHA-512.
    HmacSha512,
}

impl SigningAlgorithm {
    /// Canonical algorithm name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha512 => "hmac-sha512",
        }
    }

    /// Compute the raw MAC of `data` keyed by `key`.
    #[must_use]
    pub fn mac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Self::HmacSha256 => {
                let mut mac =
                    HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Self::HmacSha512 => {
                let mut mac =
                    HmacSha512::new_from_slice(key).expect("HMAC can accept keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac-sha256" | "sha256" => Ok(Self::HmacSha256),
            "hmac-sha512" | "sha512" => Ok(Self::HmacSha512),
            _ => Err(AuthError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// The algorithm that produced `value`.
    pub algorithm: SigningAlgorithm,
    /// Base64 (standard alphabet, padded) encoding of the raw MAC.
    pub value: String,
}

/// Sign a context: `base64(HMAC(secret, canonicalize(context)))`.
#[must_use]
pub fn sign(context: &SigningContext, secret: &Secret, algorithm: SigningAlgorithm) -> Signature {
    let raw = algorithm.mac(secret.expose(), context.canonicalize().as_bytes());
    Signature {
        algorithm,
        value: BASE64.encode(raw),
    }
}

/// Verify `candidate` against the signature recomputed from `context` and `secret`.
///
/// A candidate that is not valid base64 is simply not a match.
#[must_use]
pub fn verify(
    context: &SigningContext,
    secret: &Secret,
    algorithm: SigningAlgorithm,
    candidate: &str,
) -> bool {
    let Ok(provided) = BASE64.decode(candidate.trim()) else {
        return false;
    };
    let expected = algorithm.mac(secret.expose(), context.canonicalize().as_bytes());
    expected.as_slice().ct_eq(provided.as_slice()).into()
}
