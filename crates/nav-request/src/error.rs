use thiserror::Error;

use crate::{ClaimOwner, RequestHandle, RequestState};

/// Protocol misuse of the broker.  Search failures are not errors here:
/// they surface as `PathRequest::is_error()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("request handle {0} is stale")]
    StaleHandle(RequestHandle),

    #[error("{owner:?} already holds a claim on request {handle}")]
    AlreadyClaimed { handle: RequestHandle, owner: ClaimOwner },

    #[error("{owner:?} released request {handle} without holding a claim")]
    ReleaseWithoutClaim { handle: RequestHandle, owner: ClaimOwner },

    #[error("request {handle} is {actual}, expected {expected}")]
    InvalidState {
        handle:   RequestHandle,
        actual:   RequestState,
        expected: &'static str,
    },
}

pub type RequestResult<T> = Result<T, RequestError>;
