//! Whole-file fetching with local-conflict backup.

use std::path::{Path, PathBuf};

use chrono::Utc;
use finfetch_client::Session;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::EVENT_CHANNEL_CAPACITY;
use crate::error::TransferError;
use crate::types::{FetchOutcome, TransferEvent};

/// Fetches whole remote files into a local directory.
///
/// A fetch retrieves the file in one piece. If the local target already
/// exists it is renamed aside first (one rename, no recursion); if the
/// retrieval fails, the partial local file is removed.
pub struct Fetcher {
    events_tx: mpsc::Sender<TransferEvent>,
    events_rx: Option<mpsc::Receiver<TransferEvent>>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Creates a new fetcher.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransferEvent>> {
        self.events_rx.take()
    }

    /// Fetches one remote file into `local_dir`.
    ///
    /// The remote path is split into directory and basename; the
    /// directory part, when present, becomes the remote working
    /// directory (relative paths accumulate across calls). The local
    /// target is `local_dir/basename`; the local directory itself must
    /// already exist.
    pub async fn fetch(
        &self,
        session: &mut Session,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<(), TransferError> {
        self.emit(TransferEvent::Started {
            remote_path: remote_path.to_string(),
        });

        match self.fetch_inner(session, remote_path, local_dir).await {
            Ok(bytes) => {
                info!(remote = %remote_path, bytes, "fetch completed");
                self.emit(TransferEvent::Completed {
                    remote_path: remote_path.to_string(),
                    bytes,
                });
                Ok(())
            }
            Err(e) => {
                error!(remote = %remote_path, error = %e, "fetch failed");
                self.emit(TransferEvent::Failed {
                    remote_path: remote_path.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetches several remote files sequentially.
    ///
    /// Returns one outcome per input, in input order. A failure never
    /// aborts the remainder of the batch.
    pub async fn fetch_many(
        &self,
        session: &mut Session,
        remote_paths: &[String],
        local_dir: &Path,
    ) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::with_capacity(remote_paths.len());
        for remote in remote_paths {
            let result = self.fetch(session, remote, local_dir).await;
            outcomes.push(FetchOutcome {
                remote_path: remote.clone(),
                result,
            });
        }
        outcomes
    }

    async fn fetch_inner(
        &self,
        session: &mut Session,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<u64, TransferError> {
        let (remote_dir, basename) = split_remote_path(remote_path);
        if basename.is_empty() {
            return Err(TransferError::InvalidPath(format!(
                "no file name in {remote_path:?}"
            )));
        }

        let transport = session.transport_mut()?;
        if let Some(dir) = remote_dir {
            transport.cwd(dir).await?;
        }
        transport.set_binary().await?;

        let target = local_dir.join(basename);

        // Rename an existing target aside before writing. A failed
        // existence check must not let the retrieval overwrite a file
        // the check could not see.
        if tokio::fs::try_exists(&target).await? {
            let backup = backup_path(&target, Utc::now().timestamp());
            tokio::fs::rename(&target, &backup).await?;
            debug!(
                target = %target.display(),
                backup = %backup.display(),
                "existing file renamed aside"
            );
            self.emit(TransferEvent::BackupCreated {
                target: target.display().to_string(),
                backup: backup.display().to_string(),
            });
        }

        match transport.retr_file(basename, &target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                match tokio::fs::remove_file(&target).await {
                    Ok(()) => {}
                    Err(rm) if rm.kind() == std::io::ErrorKind::NotFound => {}
                    Err(rm) => {
                        warn!(
                            path = %target.display(),
                            error = %rm,
                            "failed to remove partial file"
                        );
                    }
                }
                Err(e.into())
            }
        }
    }

    fn emit(&self, event: TransferEvent) {
        // Non-blocking: events are dropped when the receiver lags.
        let _ = self.events_tx.try_send(event);
    }
}

/// Splits a remote path into directory and basename.
fn split_remote_path(remote: &str) -> (Option<&str>, &str) {
    match remote.rsplit_once('/') {
        Some(("", base)) => (Some("/"), base),
        Some((dir, base)) => (Some(dir), base),
        None => (None, remote),
    }
}

/// Backup name for an existing local file: `<path>-<unixtime>.backup`.
fn backup_path(path: &Path, unix_secs: i64) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!("-{unix_secs}.backup"));
    path.with_file_name(name)
}
