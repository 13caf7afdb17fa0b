//! Chunked downloads with bounded retry.

use std::path::{Component, Path, PathBuf};

use finfetch_client::{ClientError, Session};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::EVENT_CHANNEL_CAPACITY;
use crate::error::TransferError;
use crate::types::{RetryPolicy, TransferEvent};

/// Downloads remote files chunk by chunk.
///
/// The remote path is mirrored below the local directory, parent
/// directories are created as needed, and the local file is opened in
/// append mode. Transient server replies during the chunk loop are
/// retried with backoff up to the policy's attempt cap; any other
/// failure ends the download and leaves the partial file in place.
pub struct Downloader {
    retry: RetryPolicy,
    events_tx: mpsc::Sender<TransferEvent>,
    events_rx: Option<mpsc::Receiver<TransferEvent>>,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl Downloader {
    /// Creates a downloader with the given retry policy.
    pub fn new(retry: RetryPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            retry,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransferEvent>> {
        self.events_rx.take()
    }

    /// Downloads one remote file below `local_dir`, returning the number
    /// of bytes transferred by this call.
    pub async fn download(
        &self,
        session: &mut Session,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<u64, TransferError> {
        self.emit(TransferEvent::Started {
            remote_path: remote_path.to_string(),
        });

        match self.download_inner(session, remote_path, local_dir).await {
            Ok(total) => {
                info!(remote = %remote_path, bytes = total, "download completed");
                self.emit(TransferEvent::Completed {
                    remote_path: remote_path.to_string(),
                    bytes: total,
                });
                Ok(total)
            }
            Err(e) => {
                error!(remote = %remote_path, error = %e, "download failed");
                self.emit(TransferEvent::Failed {
                    remote_path: remote_path.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn download_inner(
        &self,
        session: &mut Session,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<u64, TransferError> {
        let target = local_target(local_dir, remote_path)?;
        let transport = session.transport_mut()?;

        transport.set_binary().await?;
        transport.open_retr_stream(remote_path).await?;

        // Local filesystem work starts only once the stream is open, so
        // a retrieval that never starts leaves no directories or empty
        // file behind.
        let mut file = match open_append(&target).await {
            Ok(file) => file,
            Err(e) => {
                let _ = transport.abort_retr_stream().await;
                return Err(e.into());
            }
        };

        let mut total: u64 = 0;
        let mut attempt: u32 = 0;
        loop {
            match transport.pull_chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = file.write_all(&chunk).await {
                        // Release the data stream so the session stays
                        // usable for later transfers.
                        let _ = transport.abort_retr_stream().await;
                        return Err(e.into());
                    }
                    total += chunk.len() as u64;
                    attempt = 0;
                    self.emit(TransferEvent::Progress {
                        remote_path: remote_path.to_string(),
                        bytes: total,
                    });
                    // NOOP keeps the control connection alive while the
                    // data connection does the work.
                    if let Err(e) = transport.keep_alive().await {
                        warn!(remote = %remote_path, error = %e, "keep-alive failed after chunk");
                    }
                }
                Ok(None) => break,
                Err(ClientError::Transient { code, message }) => {
                    attempt += 1;
                    if attempt > self.retry.max_attempts {
                        let _ = transport.abort_retr_stream().await;
                        return Err(TransferError::RetriesExhausted {
                            attempts: self.retry.max_attempts,
                            code,
                        });
                    }
                    warn!(
                        remote = %remote_path,
                        attempt,
                        code,
                        reply = %message,
                        "transient reply, retrying pull"
                    );
                    self.emit(TransferEvent::Retrying {
                        remote_path: remote_path.to_string(),
                        attempt,
                        code,
                    });
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        file.flush().await?;
        Ok(total)
    }

    fn emit(&self, event: TransferEvent) {
        // Non-blocking: events are dropped when the receiver lags.
        let _ = self.events_tx.try_send(event);
    }
}

/// Creates missing parent directories and opens the target for binary
/// append.
async fn open_append(target: &Path) -> std::io::Result<tokio::fs::File> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .await
}

/// Maps a remote path onto the local directory.
///
/// Root markers are stripped so absolute remote paths still land below
/// `local_dir`; parent-directory components are rejected.
fn local_target(local_dir: &Path, remote_path: &str) -> Result<PathBuf, TransferError> {
    let mut target = local_dir.to_path_buf();
    for component in Path::new(remote_path).components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory components not allowed in {remote_path:?}"
                )));
            }
            Component::Prefix(_) => {
                return Err(TransferError::InvalidPath(format!(
                    "drive prefix not allowed in {remote_path:?}"
                )));
            }
        }
    }
    if target == local_dir {
        return Err(TransferError::InvalidPath(format!(
            "no file name in {remote_path:?}"
        )));
    }
    Ok(target)
}
