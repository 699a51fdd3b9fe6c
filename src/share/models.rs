//! SMB share data models

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Lifecycle stage of a remote browsing session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    LoadingFile,
    FilesLoaded,
    Error { message: String },
}

impl ConnectionStatus {
    /// Whether the file list carries meaningful content in this status
    pub fn has_listing(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connected | ConnectionStatus::LoadingFile | ConnectionStatus::FilesLoaded
        )
    }

    /// Short label for logs and the status bar
    pub fn label(&self) -> &str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::LoadingFile => "loading",
            ConnectionStatus::FilesLoaded => "loaded",
            ConnectionStatus::Error { .. } => "error",
        }
    }
}

/// Connection descriptor parsed from a share URI
///
/// An empty `server` marks a path that could not be parsed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SmbConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub share: String,
    /// Directory inside the share, without leading or trailing slashes
    pub path: String,
}

impl fmt::Debug for SmbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("share", &self.share)
            .field("path", &self.path)
            .finish()
    }
}

impl SmbConfig {
    pub fn is_valid(&self) -> bool {
        !self.server.is_empty()
    }

    /// Fully qualified URI of this directory, credentials omitted except the user name
    pub fn to_uri(&self) -> String {
        let mut uri = format!("smb://{}", self.authority());
        for segment in self.segments() {
            uri.push('/');
            uri.push_str(&urlencoding::encode(segment));
        }
        uri
    }

    /// Fully qualified URI of a direct child of this directory
    pub fn entry_uri(&self, name: &str) -> String {
        self.child(name).to_uri()
    }

    /// Config for a direct child directory
    pub fn child(&self, name: &str) -> Self {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        };
        Self { path, ..self.clone() }
    }

    /// Config one directory up, `None` at the share root
    pub fn parent(&self) -> Option<Self> {
        if self.path.is_empty() {
            return None;
        }
        let path = match self.path.rfind('/') {
            Some(idx) => self.path[..idx].to_string(),
            None => String::new(),
        };
        Some(Self { path, ..self.clone() })
    }

    fn authority(&self) -> String {
        if self.username.is_empty() {
            self.server.clone()
        } else {
            format!("{}@{}", urlencoding::encode(&self.username), self.server)
        }
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.share.as_str())
            .chain(self.path.split('/'))
            .filter(|s| !s.is_empty())
    }
}

/// Credentials carried across screen visits when entry URIs omit them
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ShareCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ShareCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl ShareCredentials {
    /// Credentials embedded in a parsed URI, if any
    pub fn from_config(config: &SmbConfig) -> Option<Self> {
        if config.username.is_empty() && config.password.is_empty() {
            return None;
        }
        Some(Self {
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Fill in whatever the URI left out
    pub fn apply(&self, config: &mut SmbConfig) {
        if config.username.is_empty() {
            config.username = self.username.clone();
        }
        if config.password.is_empty() && config.username == self.username {
            config.password = self.password.clone();
        }
    }
}

/// Raw entry as returned by a file-share client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, is_directory: bool) -> Self {
        Self {
            name: name.into(),
            is_directory,
            size: None,
            modified: None,
        }
    }
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileListItem {
    pub file_name: String,
    /// Fully qualified `smb://` URI
    pub file_path: String,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl FileListItem {
    pub fn from_entry(config: &SmbConfig, entry: RemoteEntry) -> Self {
        Self {
            file_path: config.entry_uri(&entry.name),
            file_name: entry.name,
            is_directory: entry.is_directory,
            size: entry.size,
            modified: entry.modified,
        }
    }
}

/// Map a raw listing into display rows, one row per entry in listing order
pub fn map_listing(config: &SmbConfig, entries: Vec<RemoteEntry>) -> Vec<FileListItem> {
    entries
        .into_iter()
        .map(|e| FileListItem::from_entry(config, e))
        .collect()
}
