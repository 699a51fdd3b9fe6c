//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::AuthManager;
use crate::browse::{self, filter_files, BrowseDeps, ShareSession};
use crate::config::Config;
use crate::error::BrowseError;
use crate::media::{self, MediaKind};
use crate::playback::ExternalPlayer;
use crate::share::{
    parse_smb_path, resolve_path, FileListItem, FileShareClient, MountTable, MountedShareClient, ShareCredentials,
    SmbConfig,
};

/// Handle the `auth` command
pub fn auth(host: String, username: Option<String>, password: Option<String>, force: bool) -> Result<()> {
    println!("{}", format!("Configuring credentials for {}...", host).cyan());

    let creds = AuthManager::authenticate(&host, username, password, force)?;

    println!();
    println!("{}", "Credentials saved!".green().bold());
    println!("  Server: {}", host);
    println!("  User: {}", creds.username);
    println!();
    println!("Credentials stored securely in system keyring.");

    Ok(())
}

/// Handle the `browse` command
pub async fn browse(path: String) -> Result<()> {
    let config = Config::load()?;
    let mounts = MountTable::from_config(&config);

    let credentials = share_from_arg(&path)
        .ok()
        .and_then(|parsed| stored_credentials(&parsed));

    let factory_mounts = mounts.clone();
    let deps = BrowseDeps {
        client_factory: Box::new(move || {
            Arc::new(MountedShareClient::new(factory_mounts.clone())) as Arc<dyn FileShareClient>
        }),
        player: Arc::new(ExternalPlayer::new(&config.player, mounts)),
        settle_delay: config.settle_delay(),
    };

    browse::run_browser(path, credentials, deps).await
}

/// Handle the `ls` command
pub async fn ls(path: String, filter: Option<String>, json: bool) -> Result<()> {
    let app_config = Config::load()?;
    let mut share = share_from_arg(&path)?;
    if let Some(creds) = stored_credentials(&share) {
        creds.apply(&mut share);
    }

    let client = Arc::new(MountedShareClient::new(MountTable::from_config(&app_config)));
    let session = ShareSession::new(client, app_config.settle_delay());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Connecting to {}/{}...", share.server, share.share));

    let result = list_share(&session, &share, &spinner).await;
    session.disconnect();
    spinner.finish_and_clear();

    let files = result?;
    let files = filter_files(&files, filter.as_deref().unwrap_or(""));

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("{}", "No entries.".yellow());
        return Ok(());
    }

    for file in &files {
        println!("{}", format_entry(file));
    }
    println!();
    println!("{} entries in {}", files.len(), share.to_uri().cyan());

    Ok(())
}

async fn list_share(session: &ShareSession, share: &SmbConfig, spinner: &ProgressBar) -> Result<Vec<FileListItem>> {
    session
        .connect(&share.server, &share.username, &share.password, &share.share)
        .await
        .context("Failed to connect")?;

    spinner.set_message(format!("Listing /{}...", share.path));
    session.list_files(share).await.context("Failed to list directory")?;

    Ok(session.files())
}

/// Handle the `parse` command
pub fn parse(path: String) -> Result<()> {
    let share = parse_smb_path(&path);
    anyhow::ensure!(share.is_valid(), "{} is not a usable SMB path", path);

    println!("{} {}", "Server:".bold(), share.server);
    println!("{} {}", "Share:".bold(), share.share);
    println!("{} /{}", "Path:".bold(), share.path);
    if !share.username.is_empty() {
        println!("{} {}", "User:".bold(), share.username);
    }
    if !share.password.is_empty() {
        println!("{} ***", "Password:".bold());
    }
    println!("{} {}", "URI:".bold(), share.to_uri().cyan());

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "smbtv", &mut io::stdout());
}

/// Decode and parse a path given on the command line
fn share_from_arg(path: &str) -> Result<SmbConfig> {
    let share = resolve_path(path)?;
    if !share.is_valid() {
        return Err(BrowseError::InvalidPath(path.to_string()).into());
    }
    debug!("Parsed {:?}", share);
    Ok(share)
}

/// Keyring credentials for the path's server, if any were stored
fn stored_credentials(share: &SmbConfig) -> Option<ShareCredentials> {
    if let Some(inline) = ShareCredentials::from_config(share)
        && !inline.password.is_empty()
    {
        return Some(inline);
    }
    match AuthManager::load(&share.server) {
        Ok(creds) => Some(creds),
        Err(e) => {
            debug!("No stored credentials: {:#}", e);
            ShareCredentials::from_config(share)
        }
    }
}

fn format_entry(file: &FileListItem) -> String {
    if file.is_directory {
        return format!("{}/", file.file_name).blue().bold().to_string();
    }

    let size = file
        .size
        .map(|s| format!("{:>8.1} MB", s as f64 / 1_048_576.0))
        .unwrap_or_else(|| format!("{:>11}", "-"));
    let name = match media::classify(&file.file_name) {
        Some(MediaKind::Video) => file.file_name.green().to_string(),
        Some(MediaKind::Audio) => file.file_name.magenta().to_string(),
        None => file.file_name.clone(),
    };
    format!("{}  {}", size.dimmed(), name)
}
