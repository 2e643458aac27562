use thiserror::Error;

/// Errors surfaced by the [`crate::transport::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("non-retriable protocol error: status {0}")]
    Protocol(u16),
}

/// Errors surfaced by the [`crate::governor::Governor`].
#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("no valid credentials remain in the pool")]
    PoolExhausted,
    #[error("credential pool is empty")]
    Empty,
}

/// Errors surfaced by the [`crate::driver::SearchDriver`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Governor(#[from] GovernorError),
    #[error("request failed after exhausting retries")]
    RetriesExhausted,
}
