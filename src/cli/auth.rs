//! Keyring-based credential storage for SMB servers

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info};

use crate::share::ShareCredentials;

const KEYRING_SERVICE: &str = "smbtv";

/// Manages per-server credential storage
pub struct AuthManager;

impl AuthManager {
    /// Store credentials for `host`
    ///
    /// Existing credentials are kept unless `force` is set. Missing values are prompted for.
    pub fn authenticate(
        host: &str,
        username: Option<String>,
        password: Option<String>,
        force: bool,
    ) -> Result<ShareCredentials> {
        let host = normalize_host(host);
        anyhow::ensure!(!host.is_empty(), "Server host must not be empty");

        if !force {
            if let Ok(creds) = Self::load(&host) {
                info!("Found existing credentials for {} in keyring", host);
                return Ok(creds);
            }
        } else {
            debug!("Force flag set, ignoring stored credentials");
        }

        let username = match username {
            Some(username) => username,
            None => Input::new()
                .with_prompt(format!("Username for {}", host))
                .interact_text()
                .context("Failed to read username")?,
        };

        let password = match password {
            Some(password) => password,
            None => Password::new()
                .with_prompt("Password")
                .allow_empty_password(true)
                .interact()
                .context("Failed to read password")?,
        };

        let creds = ShareCredentials { username, password };
        Self::store(&host, &creds)?;
        info!("Credentials for {} stored in keyring", host);

        Ok(creds)
    }

    /// Load credentials for `host` from the keyring
    pub fn load(host: &str) -> Result<ShareCredentials> {
        let host = normalize_host(host);

        let username = Self::get_entry(&host, "username")?
            .get_password()
            .with_context(|| format!("No username for {} in keyring", host))?;

        let password = Self::get_entry(&host, "password")?
            .get_password()
            .with_context(|| format!("No password for {} in keyring", host))?;

        Ok(ShareCredentials { username, password })
    }

    pub fn store(host: &str, creds: &ShareCredentials) -> Result<()> {
        let host = normalize_host(host);

        Self::get_entry(&host, "username")?
            .set_password(&creds.username)
            .context("Failed to store username in keyring")?;

        Self::get_entry(&host, "password")?
            .set_password(&creds.password)
            .context("Failed to store password in keyring")?;

        debug!("Credentials for {} stored in keyring", host);
        Ok(())
    }

    fn get_entry(host: &str, key: &str) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, &entry_key(host, key)).context("Failed to access keyring")
    }
}

/// Hosts are case-insensitive; `smb://` prefixes and trailing slashes are dropped
fn normalize_host(host: &str) -> String {
    host.trim()
        .trim_start_matches("smb://")
        .trim_end_matches('/')
        .to_lowercase()
}

fn entry_key(host: &str, key: &str) -> String {
    format!("smb:{}:{}", host, key)
}
