use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Hub is closed")]
    Closed,

    #[error("Invalid history capacity: {0} (must be between 1 and {max})", max = crate::config::MAX_BUFFER_SIZE)]
    InvalidCapacity(usize),

    #[error("Invalid queue depth: {0} (must be between 1 and {max})", max = crate::config::MAX_QUEUE_DEPTH)]
    InvalidQueueDepth(usize),

    #[error("Ping scheduler requires a running tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, HubError>;
