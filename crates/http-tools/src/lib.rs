//! HTTP plumbing shared by the mcprox crates.
//!
//! This crate owns the transport side of a tool call:
//! - [`request::PlannedRequest`]: the fully resolved `(url, method, headers, body)` tuple
//! - [`runtime::HttpInvoker`]: issues exactly one HTTP call for a planned request
//! - [`safety::OutboundPolicy`]: outbound URL checks and response limits
//!
//! It intentionally knows nothing about `OpenAPI`; planning lives in `mcprox-openapi-tools`.

pub mod request;
pub mod runtime;
pub mod safety;
pub mod semantics;
