use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("resource conflict: {0}")]
    Conflict(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Conflicts are the one recoverable error class: the seeder resolves
    /// them by lookup instead of failing setup.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
