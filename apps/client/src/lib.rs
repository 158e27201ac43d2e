//! Session-aware client for the ATS resume scoring backend.
//!
//! Two pieces carry the weight here:
//! - [`http::SessionClient`] authenticates every outbound call, refreshes an
//!   expired access credential through a single-flight [`session::RefreshCoordinator`],
//!   and terminates the [`session::Session`] when refresh is impossible.
//! - [`analysis::normalize`] turns whatever the scoring endpoint returns into one
//!   fully defaulted [`analysis::AnalysisRecord`].

pub mod analysis;
pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod session;
pub mod storage;

pub use analysis::{normalize, AnalysisRecord};
pub use errors::ApiError;
pub use http::SessionClient;
pub use session::{Session, SessionState};
