//! HTTP plumbing: replayable outbound requests, buffered responses, the
//! [`Transport`] seam, and the session-aware [`SessionClient`] pipeline.

pub mod pipeline;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use pipeline::SessionClient;
pub use request::{ApiResponse, OutboundRequest, RequestBody, REFRESH_PATH};
pub use transport::{ReqwestTransport, Transport, TransportError};
