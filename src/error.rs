use thiserror::Error;

/// Errors raised by the local order cache and its persistence layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Order store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Order store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Errors raised while talking to the live order feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed connection failed: {0}")]
    Connect(String),
    #[error("Feed transport error: {0}")]
    Transport(String),
    #[error("Feed frame could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Transport(e.to_string())
    }
}

/// Errors raised by the external order API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Order API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Order API rejected the update for order {id}: HTTP {status}")]
    Rejected { id: u64, status: u16 },
}

/// Errors raised by platform notification and audio playback.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    Exit { command: String, status: String },
}

/// Errors surfaced by the application root.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
