//! Preview playback through an external player process (mpv by default)

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{PlaybackHandle, Player, SourceKind};
use crate::config::PlayerConfig;
use crate::share::MountTable;

/// Launches one player process per playback session
pub struct ExternalPlayer {
    command: String,
    args: Vec<String>,
    mounts: MountTable,
    next_id: AtomicU64,
    children: Mutex<HashMap<PlaybackHandle, Child>>,
}

impl ExternalPlayer {
    pub fn new(config: &PlayerConfig, mounts: MountTable) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            mounts,
            next_id: AtomicU64::new(1),
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions currently alive
    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.children.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Prefer the local mount path for SMB entries; the player may lack SMB support
    ///
    /// Returns what to hand the player and the backend it will read through.
    async fn target(&self, uri: &str, kind: SourceKind) -> (String, SourceKind) {
        match kind {
            SourceKind::Smb => match self.mounts.local_path(uri).await {
                Some(path) => (path.to_string_lossy().into_owned(), SourceKind::Local),
                None => {
                    debug!("No local mount for {}, passing URI through", uri);
                    (uri.to_string(), SourceKind::Smb)
                }
            },
            SourceKind::Local => (uri.to_string(), SourceKind::Local),
        }
    }
}

#[async_trait]
impl Player for ExternalPlayer {
    async fn open(&self, uri: &str, kind: SourceKind) -> Result<PlaybackHandle> {
        let (target, source) = self.target(uri, kind).await;

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch {}", self.command))?;

        let handle = PlaybackHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!("Playing {} ({}) as session {}", target, source.as_str(), handle.0);

        self.children
            .lock()
            .map_err(|_| anyhow::anyhow!("player registry poisoned"))?
            .insert(handle, child);
        Ok(handle)
    }

    fn release(&self, handle: PlaybackHandle) {
        let child = match self.children.lock() {
            Ok(mut children) => children.remove(&handle),
            Err(_) => None,
        };

        if let Some(mut child) = child {
            if let Err(e) = child.start_kill() {
                // Already exited on its own
                debug!("Player session {} not killed: {}", handle.0, e);
            }
            debug!("Released player session {}", handle.0);
        }
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        if let Ok(children) = self.children.get_mut()
            && !children.is_empty()
        {
            warn!("Dropping player with {} live sessions", children.len());
        }
    }
}
