use thiserror::Error;

use crate::endpoints::{Operation, ResourceKind};

/// Failures surfaced by the [`Gateway`](crate::Gateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No valid session. Recoverable by calling `authenticate`.
    #[error("Not authenticated. Please authenticate first.")]
    NotAuthenticated,

    /// The token endpoint rejected the credentials or could not be reached.
    #[error("Authentication failed: {cause}")]
    Auth { cause: String },

    /// The upstream API answered the call with a non-success status.
    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GatewayError {
    /// True when the fix is to (re)authenticate: either no local session
    /// exists, or the server declared the token invalid. A 401 is
    /// authoritative even while the local expiry still reads valid.
    pub const fn requires_authentication(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::Upstream { status: 401, .. }
        )
    }

    /// Upstream status code, when the failure carries one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures from the endpoint-table dispatcher, layered over the Gateway's.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The endpoint table does not list this operation for the kind.
    #[error("Operation '{operation}' is not supported for {kind}")]
    Unsupported {
        kind: ResourceKind,
        operation: Operation,
    },

    /// The operation addresses a single entry but no id was given.
    #[error("Operation '{operation}' requires an id")]
    MissingId { operation: Operation },

    /// The payload failed the shape checks done before dispatch.
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl DispatchError {
    /// See [`GatewayError::requires_authentication`].
    pub const fn requires_authentication(&self) -> bool {
        match self {
            Self::Gateway(e) => e.requires_authentication(),
            _ => false,
        }
    }
}

/// Failures from a [`SessionStore`](crate::store::SessionStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode session: {0}")]
    Serde(#[from] serde_json::Error),
}
