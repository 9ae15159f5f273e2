//! Shell configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `MASTERMIND_WORK_DIR`, `MASTERMIND_LOG_LEVEL` and
//! `MASTERMIND_BASE_URL` env overrides. A missing config file is not an
//! error — the shell must start on a machine with nothing installed — so
//! every field has a built-in default.

use std::{env, fs, path::PathBuf};

use serde::Deserialize;

use crate::error::AppError;

const CONFIG_PATH: &str = "config/default.toml";

const DEFAULT_APP_NAME: &str = "mastermind";
const DEFAULT_WORK_DIR: &str = "~/.mastermind";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Backend access configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL for the HTTP fallback transport (no trailing slash needed).
    pub base_url: String,
    /// Whether the embedded native bridge is present. A detected bridge is
    /// authoritative — its failures surface directly, HTTP is never tried.
    pub native_bridge: bool,
}

/// Fully-resolved shell configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    /// Directory holding the durable state blob (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub backend: BackendConfig,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    shell: RawShell,
    #[serde(default)]
    backend: RawBackend,
}

#[derive(Debug, Deserialize, Default)]
struct RawShell {
    app_name: Option<String>,
    work_dir: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBackend {
    base_url: Option<String>,
    native_bridge: Option<bool>,
}

/// Load `config/default.toml` (or defaults if absent) and resolve env overrides.
pub fn load() -> Result<Config, AppError> {
    let raw = match fs::read_to_string(CONFIG_PATH) {
        Ok(text) => toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("malformed {CONFIG_PATH}: {e}")))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
        Err(e) => return Err(AppError::Config(format!("cannot read {CONFIG_PATH}: {e}"))),
    };
    resolve(raw)
}

fn resolve(raw: RawConfig) -> Result<Config, AppError> {
    let work_dir = env::var("MASTERMIND_WORK_DIR")
        .ok()
        .or(raw.shell.work_dir)
        .unwrap_or_else(|| DEFAULT_WORK_DIR.to_string());

    let log_level = env::var("MASTERMIND_LOG_LEVEL")
        .ok()
        .or(raw.shell.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    let base_url = env::var("MASTERMIND_BASE_URL")
        .ok()
        .or(raw.backend.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    Ok(Config {
        app_name: raw
            .shell
            .app_name
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        work_dir: expand_tilde(&work_dir)?,
        log_level,
        backend: BackendConfig {
            base_url,
            native_bridge: raw.backend.native_bridge.unwrap_or(false),
        },
    })
}

/// Expand a leading `~` / `~/` to the user's home directory.
fn expand_tilde(path: &str) -> Result<PathBuf, AppError> {
    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("cannot resolve home directory".into()))?;
        if path == "~" {
            Ok(home)
        } else {
            Ok(home.join(&path[2..]))
        }
    } else {
        Ok(PathBuf::from(path))
    }
}
