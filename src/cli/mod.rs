//! CLI module for smbtv

use clap::{Parser, Subcommand};

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "smbtv", about = "Browse SMB shares and preview media from the terminal")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactively browse a share, previewing media on focus
    Browse {
        /// Share path, e.g. smb://user@nas/media/movies
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// List a share directory
    Ls {
        /// Share path, e.g. smb://nas/media
        #[arg(value_name = "PATH")]
        path: String,

        /// Only show entries whose name contains this text (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a share path is interpreted
    Parse {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Store SMB credentials for a server
    Auth {
        /// Server host name (with optional :port)
        #[arg(value_name = "HOST")]
        host: String,

        /// Username
        #[arg(short, long, env = "SMB_USER")]
        username: Option<String>,

        /// Password
        #[arg(short, long, env = "SMB_PASS")]
        password: Option<String>,

        /// Replace stored credentials
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
