//! FTP client session layer.
//!
//! Manages the control-connection lifecycle (connect, authenticate,
//! disconnect) and exposes the [`FtpTransport`] trait that transfer
//! operations drive. The production transport adapts `suppaftp`; tests
//! and embedders can inject their own implementation via
//! [`Session::from_transport`].

pub mod error;
pub mod ftp;
pub mod session;
pub mod transport;
pub mod types;

pub use error::ClientError;
pub use ftp::SuppaftpTransport;
pub use session::Session;
pub use transport::FtpTransport;
pub use types::{SessionConfig, SessionState};

use std::time::Duration;

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Default wait for establishing the control connection.
///
/// Deliberately long: it replaces an infinite wait, not a snappy
/// failure detector.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Read buffer size for chunked retrievals (64 KB).
pub const CHUNK_BUFFER_SIZE: usize = 64 * 1024;
