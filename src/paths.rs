//! Path resolution for cmk-converge
//!
//! # Environment Variables
//!
//! - `CMK_CONVERGE_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `CMK_CONVERGE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/cmk-converge` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\cmk-converge`
//!    - macOS/Linux: `~/.config/cmk-converge`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CMK_CONVERGE_CONFIG_DIR";

const APP_DIR: &str = "cmk-converge";

/// Name of the settings file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the cmk-converge config directory path
pub fn config_dir() -> Result<PathBuf> {
    let override_dir = std::env::var(ENV_CONFIG_DIR).ok();
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    resolve_config_dir(override_dir.as_deref(), xdg.as_deref(), platform_config_dir())
}

/// Path of the settings file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

fn resolve_config_dir(
    override_dir: Option<&str>,
    xdg_config_home: Option<&str>,
    platform_default: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        let path = expand(dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Some(xdg) = xdg_config_home.filter(|d| !d.is_empty()) {
        let path = PathBuf::from(xdg).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let path = platform_default
        .context("Could not determine home directory")?
        .join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

#[cfg(windows)]
fn platform_config_dir() -> Option<PathBuf> {
    dirs::config_dir()
}

#[cfg(not(windows))]
fn platform_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config"))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
