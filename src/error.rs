/// Result type for batch muxing operations
pub type Result<T> = std::result::Result<T, MuxerError>;

/// Error types for batch muxing operations
#[derive(thiserror::Error, Debug)]
pub enum MuxerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("A batch is already running")]
    BatchInProgress,
}
