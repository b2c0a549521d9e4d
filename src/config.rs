//! User configuration.
//!
//! `config.toml` and `default.rhai` live in the platform config directory
//! (for example `~/.config/eecalc/` on Linux). Command-line flags win over
//! anything set here.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 65_536;

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Relay address, `host:port`.
    pub server: Option<String>,
    /// Sheet namespace to join.
    pub sheet: Option<String>,
    pub nick: Option<String>,
    /// Where the terminal client writes its log.
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub offline: bool,
    /// Extra Rhai function files loaded after `default.rhai`.
    #[serde(default)]
    pub functions: Vec<PathBuf>,
}

pub fn config_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "eecalc")?;
    Some(proj.config_dir().to_path_buf())
}

/// `default.rhai` in the config directory, if it exists.
pub fn default_functions_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push("default.rhai");
    path.exists().then_some(path)
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_CONFIG_FILE_BYTES {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file too large ({} bytes, max {})",
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            ),
        )));
    }
    parse_config(&std::fs::read_to_string(path)?)
}

/// Load `explicit`, or `config.toml` from the config directory.
///
/// Problems are reported as warnings and the defaults are used instead. A
/// missing default file is silently ignored.
pub fn load_config(explicit: Option<&Path>) -> (Config, Vec<String>) {
    let mut warnings = Vec::new();
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match config_dir() {
            Some(dir) => dir.join("config.toml"),
            None => return (Config::default(), warnings),
        },
    };

    if !path.exists() {
        if explicit.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (Config::default(), warnings);
    }

    match read_config_file(&path) {
        Ok(config) => (config, warnings),
        Err(AppError::Config(err)) => {
            warnings.push(format!("Failed to parse {}: {}", path.display(), err));
            (Config::default(), warnings)
        }
        Err(err) => {
            warnings.push(format!("Failed to read {}: {}", path.display(), err));
            (Config::default(), warnings)
        }
    }
}
