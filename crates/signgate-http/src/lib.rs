//! HTTP layer for SignGate.
//!
//! Every inbound request is wrapped in a [`GatewayRequest`] and run through an
//! ordered [`Pipeline`] of [`Stage`]s:
//!
//! 1. [`CorrelationStage`] - propagate or generate the correlation identifier
//! 2. [`AuthenticationStage`] - verify the HMAC signature and body digest
//! 3. [`ForwardingStage`] - relay the verified request to the upstream
//!
//! A stage either continues with the (possibly modified) request, responds
//! directly, or fails with a [`GatewayError`](signgate_core::GatewayError)
//! that the terminal handler renders as a JSON error body.
//!
//! [`GatewayService`] adapts the pipeline to hyper's `Service` trait, serves
//! the health endpoint, and enforces the per-request deadline.

pub mod auth;
pub mod body;
pub mod correlation;
pub mod forward;
pub mod pipeline;
pub mod response;
pub mod service;
pub mod stage;

pub use auth::AuthenticationStage;
pub use body::GatewayBody;
pub use correlation::CorrelationStage;
pub use forward::ForwardingStage;
pub use pipeline::Pipeline;
pub use service::GatewayService;
pub use stage::{GatewayRequest, Stage, StageOutcome};
