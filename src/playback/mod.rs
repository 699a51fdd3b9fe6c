//! Playback collaborator
//!
//! The browser never decodes media itself. It asks a [`Player`] for a session
//! on an entry URI and releases it when focus moves on.

pub mod external;

use anyhow::Result;
use async_trait::async_trait;

pub use external::ExternalPlayer;

/// Selects the I/O backend a player should read the URI through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Smb,
    Local,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Smb => "SMB",
            SourceKind::Local => "LOCAL",
        }
    }
}

/// Opaque id of a live playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

#[async_trait]
pub trait Player: Send + Sync {
    async fn open(&self, uri: &str, kind: SourceKind) -> Result<PlaybackHandle>;

    /// Release a session. Unknown or already released handles are ignored.
    fn release(&self, handle: PlaybackHandle);
}
