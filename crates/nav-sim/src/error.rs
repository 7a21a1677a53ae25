use nav_core::AgentId;
use nav_motion::MotionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrowdError {
    #[error("crowd configuration error: {0}")]
    Config(String),

    #[error("{what} length {got} does not match agent count {expected}")]
    AgentCountMismatch {
        expected: usize,
        got:      usize,
        what:     &'static str,
    },

    #[error("{0} is not part of this crowd")]
    UnknownAgent(AgentId),

    #[error("controller error: {0}")]
    Motion(#[from] MotionError),
}

pub type CrowdResult<T> = Result<T, CrowdError>;
