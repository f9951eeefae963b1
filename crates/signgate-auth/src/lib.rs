//! HMAC request signing and verification for SignGate.
//!
//! This crate implements both sides of the signing protocol and the
//! credential store the verifier consults.
//!
//! # Overview
//!
//! A signed request carries `date`, `host`, `digest`, and `authorization`
//! headers. The `digest` header binds the body; the signature is an HMAC over
//! a canonical string built from the method, the path with query, and those
//! three headers:
//!
//! ```text
//! POST
//! /widgets?color=red
//! date:Tue, 15 Nov 1994 08:12:31 GMT
//! host:api.example.com
//! digest:SHA-256=<base64 SHA-256 of the body>
//! ```
//!
//! ```text
//! Authorization: HMAC <identity>:<base64 signature>
//! ```
//!
//! # Usage
//!
//! ```rust
//! use chrono::Utc;
//! use signgate_auth::{CredentialStore, RequestSigner, RequestVerifier, SigningAlgorithm};
//!
//! let store = CredentialStore::from_credentials([("svc-a", "s3cr3t")]);
//!
//! let (mut parts, ()) = http::Request::builder()
//!     .method("POST")
//!     .uri("http://api.example.com/widgets")
//!     .body(())
//!     .unwrap()
//!     .into_parts();
//! let body = br#"{"n":1}"#;
//! RequestSigner::new("svc-a", "s3cr3t").sign(&mut parts, body, Utc::now()).unwrap();
//!
//! let verifier = RequestVerifier::new(SigningAlgorithm::HmacSha256, "HMAC", 300_000);
//! let pending = verifier.check_headers(&parts, &store, Utc::now()).unwrap();
//! let verified = pending.verify_body(&parts, body).unwrap();
//! assert_eq!(verified.identity, "svc-a");
//! ```
//!
//! # Modules
//!
//! - [`authorization`] - `Authorization` header parsing and formatting
//! - [`canonical`] - [`SigningContext`] and canonical string construction
//! - [`credentials`] - [`CredentialStore`] with atomic reload
//! - [`digest`] - Body digest computation and validation
//! - [`error`] - Authentication and credential load errors
//! - [`signature`] - HMAC sign and constant-time verify
//! - [`signer`] - Client-side request signing
//! - [`timestamp`] - HTTP date handling and skew checks
//! - [`verifier`] - Server-side request verification

pub mod authorization;
pub mod canonical;
pub mod credentials;
pub mod digest;
pub mod error;
pub mod signature;
pub mod signer;
pub mod timestamp;
pub mod verifier;

pub use authorization::Authorization;
pub use canonical::SigningContext;
pub use credentials::{CredentialProvider, CredentialStore, CredentialStoreStatus, Secret};
pub use digest::{DigestAlgorithm, compute_digest, verify_digest};
pub use error::{AuthError, LoadError};
pub use signature::{Signature, SigningAlgorithm, sign, verify};
pub use signer::RequestSigner;
pub use verifier::{PendingVerification, RequestVerifier};
