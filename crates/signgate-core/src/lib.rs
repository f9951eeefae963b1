//! Core types, configuration, and error taxonomy for SignGate.
//!
//! This crate provides the building blocks shared by the authentication,
//! HTTP pipeline, and server crates: the [`GatewayConfig`] built once at
//! startup, the [`GatewayError`] taxonomy rendered to callers, and the
//! per-request markers ([`CorrelationId`], [`AuthenticatedIdentity`]).

mod config;
mod error;
mod types;

pub use config::{
    CorrelationConfig, CredentialsConfig, DEFAULT_CORRELATION_HEADER, GatewayConfig, LogFormat,
    ReloadTrigger, SigningConfig, UpstreamConfig,
};
pub use error::{ConfigError, ErrorBody, ErrorKind, GatewayError, GatewayResult};
pub use types::{AuthenticatedIdentity, CorrelationId};
