//! suppaftp-backed production transport.
//!
//! The only module that names a `suppaftp` type. Everything else goes
//! through [`FtpTransport`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use suppaftp::types::{FileType, Response};
use suppaftp::{AsyncFtpStream, FtpError, Status};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::compat::{FuturesAsyncReadCompatExt, TokioAsyncReadCompatExt};
use tracing::debug;

use crate::CHUNK_BUFFER_SIZE;
use crate::error::ClientError;
use crate::transport::FtpTransport;
use crate::types::SessionConfig;

/// Production transport over [`suppaftp::AsyncFtpStream`].
pub struct SuppaftpTransport {
    stream: AsyncFtpStream,
    /// Data stream of an in-progress chunked retrieval, bridged from
    /// suppaftp's futures-io reader to tokio at open time.
    data: Option<Box<dyn AsyncRead + Send + Unpin>>,
}

impl SuppaftpTransport {
    /// Establishes the control connection described by `config`.
    pub async fn connect(config: &SessionConfig) -> Result<Self, ClientError> {
        let addr = format!("{}:{}", config.host, config.port);
        let stream = tokio::time::timeout(config.timeout, AsyncFtpStream::connect(addr.as_str()))
            .await
            .map_err(|_| ClientError::Connection(format!("timed out connecting to {addr}")))?
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        debug!(%addr, "control connection established");
        Ok(Self { stream, data: None })
    }
}

impl FtpTransport for SuppaftpTransport {
    fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        let username = username.to_string();
        let password = password.to_string();
        Box::pin(async move {
            self.stream
                .login(&username, &password)
                .await
                .map_err(map_login_error)
        })
    }

    fn quit(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            self.data = None;
            self.stream.quit().await.map_err(map_ftp_error)
        })
    }

    fn cwd(
        &mut self,
        dir: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        let dir = dir.to_string();
        Box::pin(async move { self.stream.cwd(&dir).await.map_err(map_ftp_error) })
    }

    fn set_binary(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            self.stream
                .transfer_type(FileType::Binary)
                .await
                .map_err(map_ftp_error)
        })
    }

    fn name_list(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ClientError>> + Send + '_>> {
        Box::pin(async move {
            let names = self.stream.nlst(None).await.map_err(map_ftp_error)?;
            // suppaftp pre-splits the listing; the lister owns parsing,
            // so hand back one CRLF-joined blob.
            Ok(names.join("\r\n").into_bytes())
        })
    }

    fn retr_file(
        &mut self,
        remote: &str,
        local: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<u64, ClientError>> + Send + '_>> {
        let remote = remote.to_string();
        let local = local.to_path_buf();
        Box::pin(async move {
            if self.data.is_some() {
                return Err(ClientError::TransferInProgress);
            }
            let mut data = self
                .stream
                .retr_as_stream(&remote)
                .await
                .map_err(map_ftp_error)?
                .compat();
            let copied = copy_to_local(&mut data, &local).await;
            // Read the closing reply even when the local copy failed, so
            // the next command does not pick up a stale transfer reply.
            let closed = self.stream.finalize_retr_stream(data.into_inner()).await;
            let written = copied?;
            closed.map_err(map_close_error)?;
            debug!(remote = %remote, bytes = written, "whole-file retrieval complete");
            Ok(written)
        })
    }

    fn open_retr_stream(
        &mut self,
        remote: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        let remote = remote.to_string();
        Box::pin(async move {
            if self.data.is_some() {
                return Err(ClientError::TransferInProgress);
            }
            let stream = self
                .stream
                .retr_as_stream(&remote)
                .await
                .map_err(map_ftp_error)?;
            self.data = Some(Box::new(stream.compat()));
            Ok(())
        })
    }

    fn pull_chunk(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, ClientError>> + Send + '_>> {
        Box::pin(async move {
            let Some(mut data) = self.data.take() else {
                return Err(ClientError::Protocol {
                    code: 0,
                    message: "no retrieval in progress".into(),
                });
            };
            let mut buf = vec![0u8; CHUNK_BUFFER_SIZE];
            match data.read(&mut buf).await {
                Ok(0) => {
                    // End of stream: read the closing reply. Failures
                    // here are terminal; the data connection is gone.
                    self.stream
                        .finalize_retr_stream(data.compat())
                        .await
                        .map_err(map_close_error)?;
                    Ok(None)
                }
                Ok(n) => {
                    buf.truncate(n);
                    self.data = Some(data);
                    Ok(Some(buf))
                }
                Err(e) => {
                    // Drain the closing reply so the control channel
                    // stays usable after the socket failure.
                    let _ = self.stream.finalize_retr_stream(data.compat()).await;
                    Err(ClientError::Connection(e.to_string()))
                }
            }
        })
    }

    fn abort_retr_stream(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            let Some(data) = self.data.take() else {
                return Ok(());
            };
            debug!("aborting in-progress retrieval");
            self.stream
                .abort(data.compat())
                .await
                .map_err(map_close_error)
        })
    }

    fn keep_alive(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move { self.stream.noop().await.map_err(map_ftp_error) })
    }
}

/// Copies the data stream into a freshly created local file.
async fn copy_to_local(
    data: &mut (impl AsyncRead + Unpin),
    local: &Path,
) -> Result<u64, ClientError> {
    let mut file = tokio::fs::File::create(local).await?;
    let written = tokio::io::copy(data, &mut file).await?;
    file.flush().await?;
    Ok(written)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn reply_text(resp: &Response) -> String {
    String::from_utf8_lossy(&resp.body).trim().to_string()
}

fn reply_code(status: Status) -> u32 {
    status as u32
}

/// Maps a protocol failure outside of login. Negative completion in the
/// 4yz class is transient; everything else is terminal.
fn map_ftp_error(err: FtpError) -> ClientError {
    match err {
        FtpError::ConnectionError(e) => ClientError::Connection(e.to_string()),
        FtpError::UnexpectedResponse(resp) => {
            let message = reply_text(&resp);
            let code = reply_code(resp.status);
            if (400..500).contains(&code) {
                ClientError::Transient { code, message }
            } else {
                ClientError::Protocol { code, message }
            }
        }
        other => ClientError::Protocol {
            code: 0,
            message: other.to_string(),
        },
    }
}

/// Maps a failure while reading the closing reply of a data transfer.
/// The data connection is already gone at that point, so a retried pull
/// could not observe different bytes; even a 4yz reply is terminal.
fn map_close_error(err: FtpError) -> ClientError {
    match err {
        FtpError::ConnectionError(e) => ClientError::Connection(e.to_string()),
        FtpError::UnexpectedResponse(resp) => ClientError::Protocol {
            code: reply_code(resp.status),
            message: reply_text(&resp),
        },
        other => ClientError::Protocol {
            code: 0,
            message: other.to_string(),
        },
    }
}

/// Maps a login failure. Credential rejection (430/530) gets its own
/// variant so callers can tell it apart from other auth failures.
fn map_login_error(err: FtpError) -> ClientError {
    match err {
        FtpError::ConnectionError(e) => ClientError::Connection(e.to_string()),
        FtpError::UnexpectedResponse(resp) => {
            let message = reply_text(&resp);
            let code = reply_code(resp.status);
            if code == 430 || code == 530 {
                ClientError::InvalidCredentials
            } else {
                ClientError::Auth(format!("{code} {message}"))
            }
        }
        other => ClientError::Auth(other.to_string()),
    }
}
