use nav_core::AgentId;
use nav_request::{RequestError, RequestHandle, RequestState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("request {0} is still being processed")]
    PathStillProcessing(RequestHandle),

    #[error("request {0} is not this agent's pending request")]
    StaleDelivery(RequestHandle),

    #[error("request {handle} was created for {owner}, not {agent}")]
    WrongAgent {
        handle: RequestHandle,
        owner:  AgentId,
        agent:  AgentId,
    },

    #[error("request {handle} cannot be followed (state {state:?})")]
    InvalidRequestState {
        handle: RequestHandle,
        /// `None` for a stale handle.
        state:  Option<RequestState>,
    },

    #[error("no destination set")]
    NoDestination,

    #[error("broker: {0}")]
    Request(#[from] RequestError),
}

pub type MotionResult<T> = Result<T, MotionError>;
