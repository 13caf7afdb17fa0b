//! Transport trait between session logic and the FTP protocol client.
//!
//! [`FtpTransport`] is implemented by [`crate::SuppaftpTransport`] in
//! production. Using a trait keeps listing and transfer logic decoupled
//! from the protocol library and testable with mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::ClientError;

/// Abstract FTP control and data channel operations.
///
/// Methods take `&mut self`: an FTP control connection is a sequential
/// command/reply channel, and at most one data transfer is active at a
/// time. Implementations must keep that invariant and report a second
/// chunked start as [`ClientError::TransferInProgress`].
pub trait FtpTransport: Send {
    /// Logs in with the given credentials.
    ///
    /// Implementations classify failures: a rejected username/password
    /// pair is [`ClientError::InvalidCredentials`], anything else is
    /// [`ClientError::Auth`].
    fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Ends the protocol session. Drops any open data stream.
    fn quit(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Changes the remote working directory.
    fn cwd(
        &mut self,
        dir: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Switches the transfer type to binary (image) mode.
    fn set_binary(&mut self)
    -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Returns the raw bytes of a name listing (NLST) of the current
    /// directory. Parsing is the caller's job.
    fn name_list(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ClientError>> + Send + '_>>;

    /// Retrieves `remote` in one piece into the local file at `local`,
    /// returning the number of bytes written. A partial local file may
    /// remain on error; cleanup is the caller's responsibility.
    fn retr_file(
        &mut self,
        remote: &str,
        local: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64, ClientError>> + Send + '_>>;

    /// Begins a chunked retrieval of `remote`.
    fn open_retr_stream(
        &mut self,
        remote: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Pulls the next chunk of the active retrieval.
    ///
    /// `Ok(None)` is the end marker: the transfer completed and the
    /// closing reply was read. [`ClientError::Transient`] may be retried
    /// without losing position; any other error is terminal and closes
    /// the data stream.
    fn pull_chunk(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, ClientError>> + Send + '_>>;

    /// Aborts an in-progress chunked retrieval and releases its data
    /// stream, leaving the session usable for further commands. A no-op
    /// when no retrieval is active.
    fn abort_retr_stream(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Issues a NOOP on the control connection.
    fn keep_alive(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;
}
