//! Configuration file management for staffplan.
//!
//! Provides a TOML-based config file at `~/.config/staffplan/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use staffplan_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the staffplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/staffplan` or
/// `~/.config/staffplan`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("staffplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("staffplan")
}

/// Return the path to the staffplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The URL may carry a password.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct StaffplanConfig {
    pub db_config: DbConfig,
}

impl StaffplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// DB URL: `cli_db_url` > `STAFFPLAN_DATABASE_URL` env >
    /// `config_file.database.url` > `DbConfig::DEFAULT_URL`. Pool settings
    /// always come from the environment.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let (db_url, source) = if let Some(url) = cli_db_url {
            (url.to_string(), "flag")
        } else if let Ok(url) = std::env::var("STAFFPLAN_DATABASE_URL") {
            (url, "env")
        } else if let Ok(cfg) = load_config() {
            (cfg.database.url, "config file")
        } else {
            (DbConfig::DEFAULT_URL.to_string(), "default")
        };
        debug!(source, "resolved database url");

        Ok(Self {
            db_config: DbConfig::new(db_url).with_pool_env(),
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
