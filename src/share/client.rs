//! File-share client collaborator
//!
//! The SMB protocol itself is handled outside this crate. [`MountedShareClient`]
//! browses shares the OS has already mounted, either through gvfs
//! (`smb-share:server=…,share=…` directories) or through mount points listed
//! in the config.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::models::RemoteEntry;
use crate::config::Config;

/// Remote file-share client
///
/// One client backs one browsing session. `disconnect` must tolerate being
/// called without a live connection.
#[async_trait]
pub trait FileShareClient: Send + Sync {
    /// Resolves once the client can accept requests
    async fn wait_ready(&self) {}

    async fn connect(&self, server: &str, username: &str, password: &str, share: &str) -> Result<()>;

    /// List a directory relative to the share root
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    fn disconnect(&self);
}

/// Maps (server, share) pairs to local mount points
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    explicit: HashMap<String, PathBuf>,
    gvfs_root: Option<PathBuf>,
}

impl MountTable {
    pub fn new(explicit: HashMap<String, PathBuf>, gvfs_root: Option<PathBuf>) -> Self {
        let explicit = explicit
            .into_iter()
            .map(|(key, path)| (key.to_lowercase(), path))
            .collect();
        Self { explicit, gvfs_root }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.mounts.clone(), config.gvfs_root())
    }

    /// Find the local directory for a share
    pub async fn resolve(&self, server: &str, share: &str) -> Option<PathBuf> {
        let key = format!("{}/{}", server, share).to_lowercase();
        if let Some(path) = self.explicit.get(&key) {
            return Some(path.clone());
        }

        let root = self.gvfs_root.as_ref()?;
        let mut dir = tokio::fs::read_dir(root).await.ok()?;
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name();
            if gvfs_matches(&name.to_string_lossy(), server, share) {
                return Some(entry.path());
            }
        }
        None
    }

    /// Translate a `smb://` URI into a local path under its mount, if mounted
    pub async fn local_path(&self, uri: &str) -> Option<PathBuf> {
        let config = super::path::parse_smb_path(uri);
        if !config.is_valid() {
            return None;
        }
        let root = self.resolve(&config.server, &config.share).await?;
        join_relative(&root, &config.path)
    }
}

/// Match a gvfs mount directory name such as `smb-share:server=nas,share=media,user=bob`
fn gvfs_matches(dir_name: &str, server: &str, share: &str) -> bool {
    let Some(params) = dir_name.strip_prefix("smb-share:") else {
        return false;
    };

    let mut found_server = None;
    let mut found_share = None;
    for pair in params.split(',') {
        match pair.split_once('=') {
            Some(("server", value)) => found_server = Some(value),
            Some(("share", value)) => found_share = Some(value),
            _ => {}
        }
    }

    let host = server.split(':').next().unwrap_or(server);
    matches!(
        (found_server, found_share),
        (Some(s), Some(sh)) if s.eq_ignore_ascii_case(host) && sh.eq_ignore_ascii_case(share)
    )
}

/// Join a share-relative path, refusing anything that escapes the root
fn join_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Client for shares that are mounted locally
pub struct MountedShareClient {
    mounts: MountTable,
    root: Mutex<Option<PathBuf>>,
}

impl MountedShareClient {
    pub fn new(mounts: MountTable) -> Self {
        Self {
            mounts,
            root: Mutex::new(None),
        }
    }

    fn current_root(&self) -> Option<PathBuf> {
        self.root.lock().ok().and_then(|root| root.clone())
    }
}

#[async_trait]
impl FileShareClient for MountedShareClient {
    async fn connect(&self, server: &str, username: &str, _password: &str, share: &str) -> Result<()> {
        debug!("Resolving mount for {}/{} (user {:?})", server, share, username);

        let root = self
            .mounts
            .resolve(server, share)
            .await
            .ok_or_else(|| anyhow::anyhow!("Share {}/{} is not mounted", server, share))?;

        let metadata = tokio::fs::metadata(&root)
            .await
            .with_context(|| format!("Cannot access {}", root.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }

        info!("Connected to {}/{} via {}", server, share, root.display());
        if let Ok(mut slot) = self.root.lock() {
            *slot = Some(root);
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let root = self
            .current_root()
            .ok_or_else(|| anyhow::anyhow!("Not connected"))?;
        let dir = join_relative(&root, path)
            .ok_or_else(|| anyhow::anyhow!("Path {:?} leaves the share", path))?;

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read {}", dir.display()))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .with_context(|| format!("Failed to read {}", dir.display()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            // Follow symlinks so linked folders browse like folders
            let Ok(metadata) = tokio::fs::metadata(entry.path()).await else {
                debug!("Skipping unreadable entry {}", name);
                continue;
            };

            let mut remote = RemoteEntry::new(name, metadata.is_dir());
            remote.size = metadata.is_file().then(|| metadata.len());
            remote.modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            entries.push(remote);
        }

        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        debug!("Listed {} entries in {}", entries.len(), dir.display());
        Ok(entries)
    }

    fn disconnect(&self) {
        if let Ok(mut slot) = self.root.lock()
            && let Some(root) = slot.take()
        {
            debug!("Released mount {}", root.display());
        }
    }
}
