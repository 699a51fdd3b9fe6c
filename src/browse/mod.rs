//! Share browsing: session state machine, filtering and the interactive screen

pub mod filter;
pub mod interactive;
pub mod media_title;
pub mod screen;
pub mod session;

#[cfg(test)]
mod fakes;

pub use filter::filter_files;
pub use interactive::{run_browser, BrowseDeps};
pub use session::ShareSession;
