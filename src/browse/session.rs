//! Connection and listing controller for one share
//!
//! Owns the [`ConnectionStatus`] and the current listing and publishes both
//! through `watch` channels. Connect and list are long-latency calls against
//! the [`FileShareClient`]; callers usually spawn them and observe the
//! published status instead of awaiting the result.
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected --list--> LoadingFile --ok--> FilesLoaded
//!                               |fail                                  |fail
//!                               +------------------> Error <-----------+
//! any state --disconnect--> Disconnected
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::BrowseError;
use crate::share::{map_listing, ConnectionStatus, FileListItem, FileShareClient, SmbConfig};

/// Browsing session against a single share. Cheap to clone.
#[derive(Clone)]
pub struct ShareSession {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn FileShareClient>,
    settle_delay: Duration,
    status: watch::Sender<ConnectionStatus>,
    files: watch::Sender<Vec<FileListItem>>,
    /// Bumped by every disconnect; completions from an older epoch are dropped
    epoch: AtomicU64,
    /// Whether the client currently holds a session that needs releasing
    holds_session: AtomicBool,
}

impl ShareSession {
    pub fn new(client: Arc<dyn FileShareClient>, settle_delay: Duration) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (files, _) = watch::channel(Vec::new());

        Self {
            inner: Arc::new(Inner {
                client,
                settle_delay,
                status,
                files,
                epoch: AtomicU64::new(0),
                holds_session: AtomicBool::new(false),
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn files(&self) -> Vec<FileListItem> {
        self.inner.files.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    pub fn subscribe_files(&self) -> watch::Receiver<Vec<FileListItem>> {
        self.inner.files.subscribe()
    }

    /// Open a session with the server
    ///
    /// Only starts from `Disconnected` or `Error`; otherwise the call is
    /// ignored and `Ok(false)` returned. Failures are published as
    /// `Error { message }` and also returned.
    pub async fn connect(
        &self,
        server: &str,
        username: &str,
        password: &str,
        share: &str,
    ) -> Result<bool, BrowseError> {
        let epoch = self.current_epoch();
        let started = self.inner.status.send_if_modified(|status| match status {
            ConnectionStatus::Disconnected | ConnectionStatus::Error { .. } => {
                *status = ConnectionStatus::Connecting;
                true
            }
            _ => false,
        });
        if !started {
            warn!("Ignoring connect to {} while {}", server, self.status().label());
            return Ok(false);
        }

        // Retrying after an error: drop whatever the failed attempt left behind
        if self.inner.holds_session.swap(false, Ordering::SeqCst) {
            self.inner.client.disconnect();
        }

        debug!("Connecting to {}/{}", server, share);
        self.settle().await;
        let result = self.inner.client.connect(server, username, password, share).await;

        match result {
            Ok(()) => {
                let published = self.publish(epoch, |inner| {
                    inner.holds_session.store(true, Ordering::SeqCst);
                    ConnectionStatus::Connected
                });
                if !published {
                    debug!("Connect to {} finished after teardown, releasing", server);
                    self.inner.client.disconnect();
                    return Ok(false);
                }
                info!("Connected to {}/{}", server, share);
                Ok(true)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if !self.publish(epoch, |_| ConnectionStatus::Error { message: message.clone() }) {
                    return Ok(false);
                }
                warn!("Connection to {} failed: {}", server, message);
                Err(BrowseError::Connection { message })
            }
        }
    }

    /// List `config.path` and replace the published listing
    ///
    /// Requires an open session. Ignored while connecting or already loading.
    pub async fn list_files(&self, config: &SmbConfig) -> Result<bool, BrowseError> {
        let epoch = self.current_epoch();
        let holds_session = self.inner.holds_session.load(Ordering::SeqCst);
        let started = self.inner.status.send_if_modified(|status| {
            let ready = match status {
                ConnectionStatus::Connected | ConnectionStatus::FilesLoaded => true,
                ConnectionStatus::Error { .. } => holds_session,
                ConnectionStatus::Disconnected
                | ConnectionStatus::Connecting
                | ConnectionStatus::LoadingFile => false,
            };
            if ready {
                *status = ConnectionStatus::LoadingFile;
            }
            ready
        });
        if !started {
            warn!("Ignoring listing of {:?} while {}", config.path, self.status().label());
            return Ok(false);
        }

        debug!("Listing {:?} on {}/{}", config.path, config.server, config.share);
        self.settle().await;
        let result = self.inner.client.list(&config.path).await;

        match result {
            Ok(entries) => {
                let items = map_listing(config, entries);
                let count = items.len();
                if !self.publish(epoch, |inner| {
                    inner.files.send_replace(items);
                    ConnectionStatus::FilesLoaded
                }) {
                    return Ok(false);
                }
                info!("Loaded {} entries from {}", count, config.to_uri());
                Ok(true)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if !self.publish(epoch, |_| ConnectionStatus::Error { message: message.clone() }) {
                    return Ok(false);
                }
                warn!("Listing {} failed: {}", config.to_uri(), message);
                Err(BrowseError::Listing { message })
            }
        }
    }

    /// Release the remote session and reset to `Disconnected`
    ///
    /// Safe from any state and safe to repeat; the client is released at most
    /// once per session. Operations still in flight will not publish.
    pub fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.status.send_replace(ConnectionStatus::Disconnected);
        self.inner.files.send_replace(Vec::new());

        if self.inner.holds_session.swap(false, Ordering::SeqCst) {
            self.inner.client.disconnect();
            info!("Disconnected");
        }
    }

    fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Publish a status computed by `next` unless a disconnect happened since `epoch`
    fn publish(&self, epoch: u64, next: impl FnOnce(&Inner) -> ConnectionStatus) -> bool {
        let inner = &self.inner;
        inner.status.send_if_modified(|status| {
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *status = next(inner);
            true
        })
    }

    async fn settle(&self) {
        self.inner.client.wait_ready().await;
        if !self.inner.settle_delay.is_zero() {
            tokio::time::sleep(self.inner.settle_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::fakes::FakeClient;
    use crate::share::parse_smb_path;

    fn session(client: FakeClient) -> (ShareSession, Arc<FakeClient>) {
        let client = Arc::new(client);
        (ShareSession::new(client.clone(), Duration::ZERO), client)
    }

    async fn connect(session: &ShareSession) -> Result<bool, BrowseError> {
        session.connect("host", "user", "pw", "share").await
    }

    #[tokio::test]
    async fn test_connect_then_list() {
        let (session, client) = session(FakeClient::movies());
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        assert!(connect(&session).await.unwrap());
        assert_eq!(session.status(), ConnectionStatus::Connected);

        let config = parse_smb_path("smb://user:pw@host/share/movies");
        assert!(session.list_files(&config).await.unwrap());
        assert_eq!(session.status(), ConnectionStatus::FilesLoaded);

        let files = session.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "a.mp4");
        assert!(!files[0].is_directory);
        assert_eq!(files[1].file_name, "sub");
        assert!(files[1].is_directory);
        assert_eq!(*client.listed_paths.lock().unwrap(), vec!["movies".to_string()]);
    }

    #[tokio::test]
    async fn test_connect_failure_publishes_error() {
        let (session, client) = session(FakeClient::failing_connect("auth failed"));

        let err = connect(&session).await.unwrap_err();
        assert_eq!(
            err,
            BrowseError::Connection {
                message: "auth failed".to_string()
            }
        );
        assert_eq!(
            session.status(),
            ConnectionStatus::Error {
                message: "auth failed".to_string()
            }
        );

        // No session to list against
        let config = parse_smb_path("smb://host/share");
        assert!(!session.list_files(&config).await.unwrap());
        assert_eq!(FakeClient::count(&client.lists), 0);
    }

    #[tokio::test]
    async fn test_list_failure_publishes_error() {
        let (session, _client) = session(FakeClient::failing_list("permission denied"));
        connect(&session).await.unwrap();

        let config = parse_smb_path("smb://host/share/private");
        let err = session.list_files(&config).await.unwrap_err();
        assert!(matches!(err, BrowseError::Listing { .. }));
        assert_eq!(
            session.status(),
            ConnectionStatus::Error {
                message: "permission denied".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_reentry_is_ignored() {
        let (session, client) = session(FakeClient::movies());
        connect(&session).await.unwrap();

        assert!(!connect(&session).await.unwrap());
        assert_eq!(FakeClient::count(&client.connects), 1);

        let fresh = ShareSession::new(Arc::new(FakeClient::movies()), Duration::ZERO);
        let config = parse_smb_path("smb://host/share");
        assert!(!fresh.list_files(&config).await.unwrap());
        assert_eq!(fresh.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_from_any_state_releases_once() {
        let config = parse_smb_path("smb://host/share");

        // Never connected: nothing to release
        let (idle, client) = session(FakeClient::movies());
        idle.disconnect();
        assert_eq!(idle.status(), ConnectionStatus::Disconnected);
        assert_eq!(FakeClient::count(&client.disconnects), 0);

        // Connected
        let (connected, client) = session(FakeClient::movies());
        connect(&connected).await.unwrap();
        connected.disconnect();
        connected.disconnect();
        assert_eq!(connected.status(), ConnectionStatus::Disconnected);
        assert_eq!(FakeClient::count(&client.disconnects), 1);

        // Files loaded
        let (loaded, client) = session(FakeClient::movies());
        connect(&loaded).await.unwrap();
        loaded.list_files(&config).await.unwrap();
        loaded.disconnect();
        assert_eq!(loaded.status(), ConnectionStatus::Disconnected);
        assert!(loaded.files().is_empty());
        assert_eq!(FakeClient::count(&client.disconnects), 1);

        // Error after a listing failure still holds the session
        let (failed, client) = session(FakeClient::failing_list("gone"));
        connect(&failed).await.unwrap();
        let _ = failed.list_files(&config).await;
        failed.disconnect();
        failed.disconnect();
        assert_eq!(failed.status(), ConnectionStatus::Disconnected);
        assert_eq!(FakeClient::count(&client.disconnects), 1);
    }

    #[tokio::test]
    async fn test_disconnect_during_connect_suppresses_update() {
        let (client, gate) = FakeClient::movies().gated();
        let (session, client) = session(client);

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.connect("host", "user", "pw", "share").await }
        });

        let mut status = session.subscribe_status();
        status
            .wait_for(|s| *s == ConnectionStatus::Connecting)
            .await
            .unwrap();

        session.disconnect();
        gate.notify_one();

        assert!(!pending.await.unwrap().unwrap());
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        // The orphaned connection was released by the late completion
        assert_eq!(FakeClient::count(&client.disconnects), 1);

        session.disconnect();
        assert_eq!(FakeClient::count(&client.disconnects), 1);
    }

    #[tokio::test]
    async fn test_disconnect_during_listing_suppresses_update() {
        let (client, gate) = FakeClient::movies().gated_list();
        let (session, client) = session(client);
        connect(&session).await.unwrap();

        let pending = tokio::spawn({
            let session = session.clone();
            async move {
                let config = parse_smb_path("smb://host/share/movies");
                session.list_files(&config).await
            }
        });

        let mut status = session.subscribe_status();
        status
            .wait_for(|s| *s == ConnectionStatus::LoadingFile)
            .await
            .unwrap();

        session.disconnect();
        gate.notify_one();

        assert!(!pending.await.unwrap().unwrap());
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert!(session.files().is_empty());
        assert_eq!(FakeClient::count(&client.lists), 1);
        assert_eq!(FakeClient::count(&client.disconnects), 1);
    }

    #[tokio::test]
    async fn test_retry_after_error() {
        let (session, client) = session(FakeClient::failing_list("flaky"));
        connect(&session).await.unwrap();
        let config = parse_smb_path("smb://host/share");
        let _ = session.list_files(&config).await;

        // Reconnecting from Error drops the old session first
        assert!(connect(&session).await.unwrap());
        assert_eq!(FakeClient::count(&client.connects), 2);
        assert_eq!(FakeClient::count(&client.disconnects), 1);
        assert_eq!(session.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let (session, _client) = session(FakeClient::movies());
        let mut files = session.subscribe_files();

        connect(&session).await.unwrap();
        session
            .list_files(&parse_smb_path("smb://host/share/movies"))
            .await
            .unwrap();

        assert!(files.has_changed().unwrap());
        assert_eq!(files.borrow_and_update().len(), 2);
    }
}
