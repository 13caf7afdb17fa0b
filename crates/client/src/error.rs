//! Client error taxonomy.

/// Errors produced by session and transport operations.
///
/// `Transient` is the only retryable variant: it marks a 4yz negative
/// completion reply and is absorbed by the downloader's retry loop
/// rather than surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("session is closed")]
    Closed,

    #[error("a data transfer is already in progress")]
    TransferInProgress,

    #[error("transient server reply {code}: {message}")]
    Transient { code: u32, message: String },

    #[error("server reply {code}: {message}")]
    Protocol { code: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
