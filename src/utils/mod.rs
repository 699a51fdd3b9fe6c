//! Utility functions

pub mod tui_log;

pub use tui_log::{ConditionalStderrLayer, TuiModeGuard};
