//! Auth module: three-layer architecture (domain, repository, service).
//!
//! The orchestrator in [`service::AuthService`] composes the credential and
//! token stores, the session token issuer and the notification port.

pub mod api;
pub mod clock;
pub mod domain;
pub mod errors;
pub mod messages;
pub mod notify;
pub mod password;
pub mod repo;
pub mod repository;
pub mod service;
pub mod session;
pub mod smtp;
pub mod validation;

pub use api::AuthApi;
pub use errors::AuthError;
pub use service::{AuthConfig, AuthService};
