//! Screen controller for one share directory
//!
//! A [`ShareScreen`] lives for one visit to one path. It reacts to status
//! changes published by its [`ShareSession`], keeps the search filter and
//! focus state, runs at most one preview playback session, and releases both
//! the playback session and the share session when it goes away.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::filter::filter_files;
use super::session::ShareSession;
use crate::error::BrowseError;
use crate::media::{self, MediaKind};
use crate::playback::{PlaybackHandle, Player, SourceKind};
use crate::share::{
    is_blank_path, resolve_path, ConnectionStatus, FileListItem, ShareCredentials, SmbConfig,
};

/// Which of the mutually exclusive views to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenView {
    Connecting,
    EmptyDirectory,
    Loading,
    /// File list plus detail pane
    Browser,
    Disconnected,
    Error { message: String },
}

/// Pick the view for a status, listing emptiness and loading flag
pub fn select_view(status: &ConnectionStatus, files_empty: bool, is_loading: bool) -> ScreenView {
    match status {
        ConnectionStatus::Connecting => ScreenView::Connecting,
        ConnectionStatus::Connected | ConnectionStatus::FilesLoaded => {
            if files_empty && !is_loading {
                ScreenView::EmptyDirectory
            } else if is_loading {
                ScreenView::Loading
            } else {
                ScreenView::Browser
            }
        }
        ConnectionStatus::LoadingFile => ScreenView::Loading,
        ConnectionStatus::Disconnected => ScreenView::Disconnected,
        ConnectionStatus::Error { message } => ScreenView::Error {
            message: message.clone(),
        },
    }
}

/// What the controller did in response to a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing to do for this status
    Idle,
    Connect,
    List,
    Loaded,
    /// Surfaced an error notice
    Reported,
    /// Path was empty or unusable; nothing was requested
    Rejected,
}

/// Entry that currently has input focus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusState {
    pub focused_file_name: Option<String>,
    pub focused_is_dir: bool,
    pub focused_media_uri: String,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            focused_file_name: None,
            focused_is_dir: true,
            focused_media_uri: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastOp {
    Connect,
    List,
}

pub struct ShareScreen {
    path: String,
    credentials: Option<ShareCredentials>,
    session: ShareSession,
    player: Arc<dyn Player>,
    focus: FocusState,
    playback: Option<(PlaybackHandle, MediaKind)>,
    query: String,
    filtered: Vec<FileListItem>,
    is_loading: bool,
    is_first_load: bool,
    last_op: LastOp,
    notices: VecDeque<BrowseError>,
    tasks: Vec<JoinHandle<()>>,
    torn_down: bool,
}

impl ShareScreen {
    /// `path` is the navigation path, percent-encoded or plain
    pub fn new(
        path: impl Into<String>,
        credentials: Option<ShareCredentials>,
        session: ShareSession,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            path: path.into(),
            credentials,
            session,
            player,
            focus: FocusState::default(),
            playback: None,
            query: String::new(),
            filtered: Vec::new(),
            is_loading: true,
            is_first_load: true,
            last_op: LastOp::Connect,
            notices: VecDeque::new(),
            tasks: Vec::new(),
            torn_down: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> ConnectionStatus {
        self.session.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.session.subscribe_status()
    }

    pub fn subscribe_files(&self) -> watch::Receiver<Vec<FileListItem>> {
        self.session.subscribe_files()
    }

    /// Parsed path with carried credentials applied, `None` when unusable
    pub fn config(&self) -> Option<SmbConfig> {
        let mut config = resolve_path(&self.path).ok()?;
        if !config.is_valid() {
            return None;
        }
        if let Some(credentials) = &self.credentials {
            credentials.apply(&mut config);
        }
        Some(config)
    }

    /// React to the current path and connection status
    ///
    /// Called once at start and again whenever the published status changes.
    /// Connect and list requests run as background tasks whose completion
    /// shows up as the next status change.
    pub fn on_state_change(&mut self) -> Reaction {
        if self.torn_down {
            return Reaction::Idle;
        }

        if is_blank_path(&self.path) {
            warn!("Navigation path is empty");
            return Reaction::Rejected;
        }

        let mut config = match resolve_path(&self.path) {
            Ok(config) => config,
            Err(e) => {
                error!("Path decoding failed: {}", e);
                self.notices.push_back(e);
                return Reaction::Rejected;
            }
        };

        if !config.is_valid() {
            error!("Invalid SMB path: {}", self.path);
            self.notices.push_back(BrowseError::InvalidPath(self.path.clone()));
            return Reaction::Rejected;
        }
        if let Some(credentials) = &self.credentials {
            credentials.apply(&mut config);
        }

        self.refresh_filter();

        let status = self.session.status();
        match status {
            ConnectionStatus::Disconnected => {
                debug!("Not connected, connecting to {}", config.server);
                self.last_op = LastOp::Connect;
                let session = self.session.clone();
                self.spawn(async move {
                    let _ = session
                        .connect(&config.server, &config.username, &config.password, &config.share)
                        .await;
                });
                Reaction::Connect
            }
            ConnectionStatus::Connected => {
                debug!("Connected, listing {:?}", config.path);
                self.last_op = LastOp::List;
                let session = self.session.clone();
                self.spawn(async move {
                    let _ = session.list_files(&config).await;
                });
                Reaction::List
            }
            ConnectionStatus::Error { message } => {
                error!("SMB error: {}", message);
                self.notices.push_back(match self.last_op {
                    LastOp::Connect => BrowseError::Connection { message },
                    LastOp::List => BrowseError::Listing { message },
                });
                Reaction::Reported
            }
            ConnectionStatus::LoadingFile => {
                debug!("Loading files...");
                Reaction::Idle
            }
            ConnectionStatus::FilesLoaded => {
                debug!("Files loaded");
                self.is_loading = false;
                if self.is_first_load {
                    self.is_first_load = false;
                }
                Reaction::Loaded
            }
            ConnectionStatus::Connecting => {
                debug!("Connecting...");
                Reaction::Idle
            }
        }
    }

    /// Start over after an error. Ignored unless the session is in `Error`.
    pub fn retry(&mut self) -> Reaction {
        if !matches!(self.session.status(), ConnectionStatus::Error { .. }) {
            return Reaction::Idle;
        }
        info!("Retrying {}", self.path);
        self.session.disconnect();
        self.is_loading = true;
        self.on_state_change()
    }

    /// Re-list the current directory
    pub fn refresh(&mut self) -> Reaction {
        let Some(config) = self.config() else {
            return Reaction::Rejected;
        };
        if self.session.status() != ConnectionStatus::FilesLoaded {
            return Reaction::Idle;
        }
        self.last_op = LastOp::List;
        let session = self.session.clone();
        self.spawn(async move {
            let _ = session.list_files(&config).await;
        });
        Reaction::List
    }

    /// Move focus to `item`, swapping the preview playback session
    ///
    /// The previous session is always released before a new one is opened.
    /// Playback failures become notices; browsing carries on.
    pub async fn on_focus(&mut self, item: &FileListItem) {
        if self.torn_down {
            return;
        }
        if self.focus.focused_file_name.as_deref() == Some(item.file_name.as_str())
            && self.focus.focused_is_dir == item.is_directory
        {
            return;
        }

        self.focus = FocusState {
            focused_file_name: Some(item.file_name.clone()),
            focused_is_dir: item.is_directory,
            focused_media_uri: item.file_path.clone(),
        };
        debug!("Focus: {} (directory: {})", item.file_name, item.is_directory);

        self.release_playback();

        if item.is_directory {
            return;
        }
        let Some(kind) = media::classify(&item.file_name) else {
            return;
        };

        debug!("Preparing {} preview: {}", kind.label(), item.file_name);
        match self.player.open(&self.focus.focused_media_uri, SourceKind::Smb).await {
            Ok(handle) => self.playback = Some((handle, kind)),
            Err(e) => {
                let err = BrowseError::PlaybackInit {
                    message: format!("{:#}", e),
                };
                error!("{}", err);
                self.notices.push_back(err);
            }
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.refresh_filter();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Recompute the displayed subset from the latest listing
    pub fn refresh_filter(&mut self) {
        if !self.session.status().has_listing() {
            self.filtered.clear();
            return;
        }
        self.filtered = filter_files(&self.session.files(), &self.query);
    }

    pub fn filtered(&self) -> &[FileListItem] {
        &self.filtered
    }

    /// Searching produced nothing although the directory has entries
    pub fn no_search_results(&self) -> bool {
        self.filtered.is_empty() && !self.query.trim().is_empty()
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    /// Kind of the media being previewed, if any
    pub fn playing(&self) -> Option<MediaKind> {
        self.playback.map(|(_, kind)| kind)
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_first_load(&self) -> bool {
        self.is_first_load
    }

    pub fn view(&self) -> ScreenView {
        select_view(
            &self.session.status(),
            self.session.files().is_empty(),
            self.is_loading,
        )
    }

    pub fn take_notices(&mut self) -> Vec<BrowseError> {
        self.notices.drain(..).collect()
    }

    /// Wait for every connect/list request issued so far
    #[cfg(test)]
    pub async fn wait_idle(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Share request task failed: {}", e);
            }
        }
    }

    /// Release playback and the share session
    ///
    /// Idempotent; also runs on drop. Requests still in flight finish
    /// against a disconnected session and publish nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!("Leaving {}, releasing resources", self.path);
        self.release_playback();
        self.session.disconnect();
    }

    fn release_playback(&mut self) {
        if let Some((handle, _)) = self.playback.take() {
            self.player.release(handle);
        }
    }

    fn spawn(&mut self, request: impl std::future::Future<Output = ()> + Send + 'static) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(tokio::spawn(request));
    }
}

impl Drop for ShareScreen {
    fn drop(&mut self) {
        self.teardown();
    }
}
