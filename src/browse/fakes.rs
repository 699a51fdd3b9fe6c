//! In-memory collaborators for browser tests

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::playback::{PlaybackHandle, Player, SourceKind};
use crate::share::{FileShareClient, RemoteEntry};

pub struct FakeClient {
    connect_error: Option<String>,
    listing: Result<Vec<RemoteEntry>, String>,
    gate: Option<Arc<Notify>>,
    list_gate: Option<Arc<Notify>>,
    pub connects: AtomicUsize,
    pub lists: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub listed_paths: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn with_entries(entries: Vec<RemoteEntry>) -> Self {
        Self {
            connect_error: None,
            listing: Ok(entries),
            gate: None,
            list_gate: None,
            connects: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            listed_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn movies() -> Self {
        Self::with_entries(vec![RemoteEntry::new("a.mp4", false), RemoteEntry::new("sub", true)])
    }

    pub fn failing_connect(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::movies()
        }
    }

    pub fn failing_list(message: &str) -> Self {
        Self {
            listing: Err(message.to_string()),
            ..Self::movies()
        }
    }

    /// Connect blocks until the returned gate is notified
    pub fn gated(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                gate: Some(gate.clone()),
                ..self
            },
            gate,
        )
    }

    /// List blocks until the returned gate is notified
    pub fn gated_list(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                list_gate: Some(gate.clone()),
                ..self
            },
            gate,
        )
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileShareClient for FakeClient {
    async fn connect(&self, _server: &str, _username: &str, _password: &str, _share: &str) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.connect_error {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.listed_paths.lock().unwrap().push(path.to_string());
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        self.listing.clone().map_err(|message| anyhow::anyhow!("{}", message))
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every open/release in order
#[derive(Default)]
pub struct FakePlayer {
    pub fail_with: Option<String>,
    next_id: AtomicU64,
    pub events: Mutex<Vec<String>>,
    live: Mutex<Vec<PlaybackHandle>>,
}

impl FakePlayer {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn opens(&self) -> usize {
        self.events().iter().filter(|e| e.starts_with("open")).count()
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn open(&self, uri: &str, kind: SourceKind) -> Result<PlaybackHandle> {
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }
        let handle = PlaybackHandle(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut live = self.live.lock().unwrap();
        assert!(live.is_empty(), "opened {} while {:?} still live", uri, live);
        live.push(handle);
        self.events
            .lock()
            .unwrap()
            .push(format!("open {} {} #{}", uri, kind.as_str(), handle.0));
        Ok(handle)
    }

    fn release(&self, handle: PlaybackHandle) {
        let mut live = self.live.lock().unwrap();
        if let Some(pos) = live.iter().position(|h| *h == handle) {
            live.remove(pos);
            self.events.lock().unwrap().push(format!("release #{}", handle.0));
        }
    }
}
