//! Session lifecycle: connect, authenticate, disconnect.

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ClientError;
use crate::ftp::SuppaftpTransport;
use crate::transport::FtpTransport;
use crate::types::{SessionConfig, SessionState};

/// An FTP session over one control connection.
///
/// Listing and transfer operations acquire the underlying transport
/// through [`Session::transport_mut`], which is the single enforcement
/// point for the authenticated-session invariant.
pub struct Session {
    id: String,
    config: SessionConfig,
    transport: Box<dyn FtpTransport>,
    state: SessionState,
}

impl Session {
    /// Connects to the server described by `config`.
    pub async fn connect(config: SessionConfig) -> Result<Self, ClientError> {
        let transport = SuppaftpTransport::connect(&config).await?;
        let session = Self::from_transport(config, Box::new(transport));
        info!(
            session = %session.id,
            host = %session.config.host,
            port = session.config.port,
            "session connected"
        );
        Ok(session)
    }

    /// Wraps an already-connected transport.
    ///
    /// Injection seam for tests and for embedders with their own
    /// transport implementation.
    pub fn from_transport(config: SessionConfig, transport: Box<dyn FtpTransport>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            transport,
            state: SessionState::Connected,
        }
    }

    /// Logs in with the given credentials.
    ///
    /// A rejected username/password pair surfaces as
    /// [`ClientError::InvalidCredentials`]; any other login failure as
    /// [`ClientError::Auth`].
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        if self.state == SessionState::Closed {
            return Err(ClientError::Closed);
        }
        self.transport.login(username, password).await?;
        self.state = SessionState::Authenticated;
        info!(session = %self.id, user = %username, "authenticated");
        Ok(())
    }

    /// Ends the session. Idempotent: calling it on a closed session is
    /// a no-op, and QUIT failures are swallowed.
    pub async fn disconnect(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.transport.quit().await {
            debug!(session = %self.id, error = %e, "quit failed during disconnect");
        }
        self.state = SessionState::Closed;
        info!(session = %self.id, "session closed");
    }

    /// Returns the transport for transfer operations.
    ///
    /// Errors unless the session is authenticated.
    pub fn transport_mut(&mut self) -> Result<&mut dyn FtpTransport, ClientError> {
        match self.state {
            SessionState::Authenticated => Ok(&mut *self.transport),
            SessionState::Connected => Err(ClientError::NotAuthenticated),
            SessionState::Closed => Err(ClientError::Closed),
        }
    }

    /// Session identifier used in log fields.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connection parameters this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
