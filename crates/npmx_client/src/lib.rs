//! # npmx client
//!
//! Session-aware client for the Nginx Proxy Manager admin API.
//!
//! [`Gateway`] owns the token lifecycle and the HTTP plumbing; the endpoint
//! table in [`ResourceKind::spec`] describes which operations exist for each
//! resource kind, and [`dispatch`] resolves one [`ResourceCall`] against it.
//! Responses stay loosely typed (`serde_json::Value`) end to end: the
//! upstream owns the schemas and this crate forwards them verbatim.

mod endpoints;
mod error;
mod gateway;
mod store;
mod views;

pub use endpoints::{
    EndpointSpec, Operation, ResourceCall, ResourceKind, audit_log, dispatch, hosts_report,
};
pub use error::{DispatchError, GatewayError, StoreError};
pub use gateway::{AuthStatus, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TOKEN_TTL, Gateway, Session};
pub use store::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
pub use views::{CertificateRef, ResourceSummary};
