#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawnFailure(std::io::Error),

    #[error("Invalid task state: {0}")]
    InvalidTaskState(String),

    #[error("Stale iteration handle")]
    StaleHandle,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ListingError>;

pub(crate) fn invalid_task_state(message: impl Into<String>) -> ListingError {
    ListingError::InvalidTaskState(message.into())
}
