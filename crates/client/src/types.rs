//! Public types for the session layer.

use std::time::Duration;

use crate::{DEFAULT_FTP_PORT, DEFAULT_SESSION_TIMEOUT};

/// Connection parameters for an FTP session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server host name or address.
    pub host: String,
    /// Control connection port.
    pub port: u16,
    /// Maximum wait for establishing the control connection.
    pub timeout: Duration,
}

impl SessionConfig {
    /// Creates a config for `host` with the default port and timeout.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_FTP_PORT,
            timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

/// Lifecycle state of a session.
///
/// A `Session` value only exists once the control connection is up, so
/// the pre-connect state has no representation here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Control connection established, not yet logged in.
    Connected,
    /// Logged in; listing and transfer operations are allowed.
    Authenticated,
    /// QUIT issued (or attempted); the session is unusable.
    Closed,
}
