use thiserror::Error;

/// Failure reported by an external collaborator (embedding, search, chat,
/// index or tool backend).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("backend returned an empty result")]
    EmptyResponse,

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CollaboratorError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Transport(_) | CollaboratorError::Timeout(_) => true,
            CollaboratorError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;
