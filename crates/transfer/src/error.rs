//! Transfer error types.

use finfetch_client::ClientError;

/// Errors produced by listing, fetch, and download operations.
///
/// Session and protocol failures pass through as [`ClientError`] so the
/// full taxonomy stays matchable; `Io` covers the local filesystem side
/// (directory creation, open, write, rename, remove).
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("session error: {0}")]
    Session(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid remote path: {0}")]
    InvalidPath(String),

    #[error("retries exhausted after {attempts} attempts (last reply {code})")]
    RetriesExhausted { attempts: u32, code: u32 },
}
