//! Errors surfaced by the share browser
//!
//! Every variant is recovered at the screen boundary: it is logged and shown
//! to the user as a notice or an in-place error view, never propagated as a
//! crash.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowseError {
    /// Navigation path was not valid percent-encoding
    #[error("Malformed path: {0}")]
    PathDecode(String),

    /// Path decoded fine but has no recognizable server
    #[error("Invalid SMB path: {0}")]
    InvalidPath(String),

    #[error("SMB connection failed: {message}")]
    Connection { message: String },

    #[error("SMB listing failed: {message}")]
    Listing { message: String },

    #[error("Player initialization failed: {message}")]
    PlaybackInit { message: String },
}
