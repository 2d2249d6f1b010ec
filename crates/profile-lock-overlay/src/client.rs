//! Request/response seam towards the authorization service.

use profile_lock_core::{LockRequest, LockResponse, LockSnapshot};
use thiserror::Error;

/// Abstract transport used by overlay controllers.
pub trait LockClient: Send + Sync {
    /// Sends one request and waits for its response.
    ///
    /// # Errors
    /// Returns [`TransportError::Unavailable`] when the control process cannot
    /// be reached (expected during context reload).
    fn request(&self, request: &LockRequest) -> Result<LockResponse, TransportError>;
}

/// Queries `{isLocked, hasPassword}`.
///
/// # Errors
/// Propagates transport failures and reports an outcome-shaped answer as
/// [`TransportError::UnexpectedResponse`].
pub fn fetch_snapshot(client: &dyn LockClient) -> Result<LockSnapshot, TransportError> {
    match client.request(&LockRequest::GetLockState)? {
        LockResponse::State(snapshot) => Ok(snapshot),
        LockResponse::Outcome(outcome) => Err(TransportError::UnexpectedResponse(
            outcome
                .error
                .unwrap_or_else(|| "outcome returned for state query".to_string()),
        )),
    }
}

/// Transport errors seen by rendering contexts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Message channel not reachable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    /// Response shape did not match the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
