fn main() {
    println!("Run `cargo test -p transfer-flow` to execute end-to-end transfer tests.");
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::future::Future;
    use std::path::Path;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use finfetch_client::{ClientError, FtpTransport, Session, SessionConfig, SessionState};
    use finfetch_transfer::{
        Downloader, Fetcher, RetryPolicy, TransferError, TransferEvent, list_names,
    };

    const CHUNK: usize = 4096;

    /// In-memory stand-in for a remote server.
    ///
    /// Holds a path-keyed file tree, tracks the working directory the
    /// way a server would (relative changes accumulate, absolute ones
    /// reset), serves listings of the current directory, and streams
    /// file contents in fixed-size chunks. Transient replies can be
    /// injected in front of chosen chunks.
    struct FakeServer {
        files: BTreeMap<String, Vec<u8>>,
        cwd: String,
        calls: Arc<Mutex<Vec<String>>>,
        login_err: Option<ClientError>,
        pending: VecDeque<Result<Option<Vec<u8>>, ClientError>>,
        glitches: Vec<usize>,
    }

    impl FakeServer {
        fn new() -> Self {
            Self {
                files: BTreeMap::new(),
                cwd: String::new(),
                calls: Arc::new(Mutex::new(Vec::new())),
                login_err: None,
                pending: VecDeque::new(),
                glitches: Vec::new(),
            }
        }

        fn with_file(mut self, path: &str, data: &[u8]) -> Self {
            self.files.insert(path.to_string(), data.to_vec());
            self
        }

        /// Rejects the next login attempt with `err`; later attempts succeed.
        fn reject_next_login(mut self, err: ClientError) -> Self {
            self.login_err = Some(err);
            self
        }

        /// Injects one transient reply in front of each listed chunk index.
        fn with_glitches(mut self, before_chunks: &[usize]) -> Self {
            self.glitches = before_chunks.to_vec();
            self
        }

        fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.calls)
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn resolve(&self, name: &str) -> String {
            let name = name.trim_start_matches('/');
            if name.contains('/') || self.cwd.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", self.cwd, name)
            }
        }
    }

    fn glitch(code: u32) -> ClientError {
        ClientError::Transient {
            code,
            message: "requested action not taken, try again".into(),
        }
    }

    impl FtpTransport for FakeServer {
        fn login(
            &mut self,
            username: &str,
            _password: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            let username = username.to_string();
            Box::pin(async move {
                self.record(format!("login {username}"));
                match self.login_err.take() {
                    Some(err) => Err(err),
                    None => Ok(()),
                }
            })
        }

        fn quit(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            Box::pin(async move {
                self.record("quit");
                Ok(())
            })
        }

        fn cwd(
            &mut self,
            dir: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            let dir = dir.to_string();
            Box::pin(async move {
                self.record(format!("cwd {dir}"));
                if let Some(rest) = dir.strip_prefix('/') {
                    self.cwd = rest.trim_end_matches('/').to_string();
                } else if self.cwd.is_empty() {
                    self.cwd = dir;
                } else {
                    self.cwd = format!("{}/{}", self.cwd, dir);
                }
                Ok(())
            })
        }

        fn set_binary(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            Box::pin(async move {
                self.record("set_binary");
                Ok(())
            })
        }

        fn name_list(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ClientError>> + Send + '_>> {
            Box::pin(async move {
                self.record("name_list");
                let prefix = if self.cwd.is_empty() {
                    String::new()
                } else {
                    format!("{}/", self.cwd)
                };
                let names: Vec<&str> = self
                    .files
                    .keys()
                    .filter_map(|k| k.strip_prefix(prefix.as_str()))
                    .filter(|rest| !rest.contains('/'))
                    .collect();
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
                self.record(format!("retr {remote}"));
                let path = self.resolve(&remote);
                let Some(data) = self.files.get(&path) else {
                    return Err(ClientError::Protocol {
                        code: 550,
                        message: format!("{path}: no such file"),
                    });
                };
                tokio::fs::write(&local, data)
                    .await
                    .map_err(ClientError::Io)?;
                Ok(data.len() as u64)
            })
        }

        fn open_retr_stream(
            &mut self,
            remote: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            let remote = remote.to_string();
            Box::pin(async move {
                self.record(format!("open {remote}"));
                let path = self.resolve(&remote);
                let Some(data) = self.files.get(&path) else {
                    return Err(ClientError::Protocol {
                        code: 550,
                        message: format!("{path}: no such file"),
                    });
                };
                let glitches = self.glitches.clone();
                let mut pending = VecDeque::new();
                for (i, chunk) in data.chunks(CHUNK).enumerate() {
                    for _ in glitches.iter().filter(|g| **g == i) {
                        pending.push_back(Err(glitch(450)));
                    }
                    pending.push_back(Ok(Some(chunk.to_vec())));
                }
                pending.push_back(Ok(None));
                self.pending = pending;
                Ok(())
            })
        }

        fn pull_chunk(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, ClientError>> + Send + '_>>
        {
            Box::pin(async move {
                self.record("pull");
                self.pending.pop_front().unwrap_or_else(|| {
                    Err(ClientError::Protocol {
                        code: 0,
                        message: "no retrieval in progress".into(),
                    })
                })
            })
        }

        fn abort_retr_stream(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            Box::pin(async move {
                self.record("abort");
                self.pending.clear();
                Ok(())
            })
        }

        fn keep_alive(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
            Box::pin(async move {
                self.record("keepalive");
                Ok(())
            })
        }
    }

    async fn login(server: FakeServer) -> Session {
        let mut session =
            Session::from_transport(SessionConfig::new("ftp.example.test"), Box::new(server));
        session.authenticate("reader", "letmein").await.unwrap();
        session
    }

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 1.0,
        }
    }

    async fn drain(mut rx: tokio::sync::mpsc::Receiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    // --- Session lifecycle ---

    #[tokio::test]
    async fn list_then_fetch_then_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let server = FakeServer::new()
            .with_file("pub/reports/april.csv", b"a,b\n1,2\n")
            .with_file("pub/reports/may.csv", b"a,b\n3,4\n")
            .with_file("pub/readme.txt", b"reports live one level down\n");
        let log = server.call_log();
        let mut session = login(server).await;
        assert_eq!(session.state(), SessionState::Authenticated);

        // First fetch leaves the session sitting in pub/reports.
        let fetcher = Fetcher::new();
        fetcher
            .fetch(&mut session, "pub/reports/april.csv", dir.path())
            .await
            .unwrap();

        let names = list_names(&mut session).await.unwrap();
        assert_eq!(names, ["april.csv", "may.csv"]);

        fetcher
            .fetch(&mut session, "may.csv", dir.path())
            .await
            .unwrap();

        session.disconnect().await;
        assert_eq!(session.state(), SessionState::Closed);
        session.disconnect().await;

        assert_eq!(
            std::fs::read(dir.path().join("april.csv")).unwrap(),
            b"a,b\n1,2\n"
        );
        assert_eq!(
            std::fs::read(dir.path().join("may.csv")).unwrap(),
            b"a,b\n3,4\n"
        );
        let calls = log.lock().unwrap();
        assert_eq!(calls.iter().filter(|c| *c == "quit").count(), 1);
    }

    #[tokio::test]
    async fn relative_directories_accumulate_across_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let server = FakeServer::new()
            .with_file("pub/a.txt", b"top")
            .with_file("pub/data/b.txt", b"nested");
        let mut session = login(server).await;

        let fetcher = Fetcher::new();
        fetcher
            .fetch(&mut session, "pub/a.txt", dir.path())
            .await
            .unwrap();
        // The second path is relative to where the first one left us.
        fetcher
            .fetch(&mut session, "data/b.txt", dir.path())
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"top");
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"nested");
    }

    // --- Authentication failures ---

    #[tokio::test]
    async fn rejected_credentials_allow_a_second_attempt() {
        let server = FakeServer::new().reject_next_login(ClientError::InvalidCredentials);
        let mut session =
            Session::from_transport(SessionConfig::new("ftp.example.test"), Box::new(server));

        let err = session.authenticate("reader", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));
        assert_eq!(session.state(), SessionState::Connected);

        session.authenticate("reader", "letmein").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn service_outage_is_not_a_credential_rejection() {
        let server = FakeServer::new()
            .reject_next_login(ClientError::Auth("421 service not available".into()));
        let mut session =
            Session::from_transport(SessionConfig::new("ftp.example.test"), Box::new(server));

        let err = session.authenticate("reader", "letmein").await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
        assert!(!matches!(err, ClientError::InvalidCredentials));
    }

    // --- Chunked downloads ---

    #[tokio::test]
    async fn chunked_download_survives_mid_stream_hiccups() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let server = FakeServer::new()
            .with_file("pub/big.bin", &payload)
            .with_glitches(&[1]);
        let mut session = login(server).await;

        let mut downloader = Downloader::new(quick_retry(3));
        let events_rx = downloader.take_events().unwrap();
        let total = downloader
            .download(&mut session, "pub/big.bin", dir.path())
            .await
            .unwrap();
        drop(downloader);

        assert_eq!(total, payload.len() as u64);
        let written = std::fs::read(dir.path().join("pub/big.bin")).unwrap();
        assert_eq!(written, payload, "retried stream must not corrupt the file");

        let events = drain(events_rx).await;
        let retries: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, TransferEvent::Retrying { .. }))
            .collect();
        assert_eq!(retries.len(), 1);
        assert!(matches!(
            events.last(),
            Some(TransferEvent::Completed { bytes, .. }) if *bytes == payload.len() as u64
        ));
    }

    #[tokio::test]
    async fn download_gives_up_when_the_server_keeps_deferring() {
        let dir = tempfile::tempdir().unwrap();
        let payload = vec![7u8; CHUNK * 2];
        let server = FakeServer::new()
            .with_file("slow.bin", &payload)
            .with_glitches(&[1, 1, 1]);
        let mut session = login(server).await;

        let err = Downloader::new(quick_retry(2))
            .download(&mut session, "slow.bin", dir.path())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::RetriesExhausted {
                attempts: 2,
                code: 450,
            }
        ));
        // The first chunk made it to disk before the server stalled.
        let partial = std::fs::read(dir.path().join("slow.bin")).unwrap();
        assert_eq!(partial.len(), CHUNK);
    }

    // --- Batch fetching ---

    #[tokio::test]
    async fn batch_reports_every_outcome_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let server = FakeServer::new()
            .with_file("a.txt", b"alpha")
            .with_file("c.txt", b"gamma");
        let mut session = login(server).await;

        let remotes = vec![
            "a.txt".to_string(),
            "missing.txt".to_string(),
            "c.txt".to_string(),
        ];
        let outcomes = Fetcher::new()
            .fetch_many(&mut session, &remotes, dir.path())
            .await;

        let paths: Vec<_> = outcomes.iter().map(|o| o.remote_path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "missing.txt", "c.txt"]);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(TransferError::Session(ClientError::Protocol { code: 550, .. }))
        ));
        assert!(outcomes[2].result.is_ok());
        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("missing.txt").exists());
        assert!(dir.path().join("c.txt").exists());
    }
}
