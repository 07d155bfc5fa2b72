use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for reelcast.

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REELCAST_CONFIG";

/// Get the reelcast config directory
pub fn reelcast_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("reelcast");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Path of the config file, honoring `REELCAST_CONFIG` when set
pub fn reelcast_config_file() -> Result<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(explicit));
    }
    Ok(reelcast_config_dir()?.join("reelcast.toml"))
}

/// Default working directory for transient scene files
pub fn reelcast_work_dir() -> Result<PathBuf> {
    let work_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("reelcast")
        .join("work");

    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating work directory at {}", work_dir.display()))?;

    Ok(work_dir)
}
