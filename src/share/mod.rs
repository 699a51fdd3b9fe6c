//! SMB share access: URI parsing, data models and the file-share client

pub mod client;
pub mod models;
pub mod path;

pub use client::{FileShareClient, MountTable, MountedShareClient};
pub use models::*;
pub use path::{is_blank_path, parse_smb_path, resolve_path};
