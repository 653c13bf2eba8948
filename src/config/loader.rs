// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitepipeError};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Sitepipe.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration to use for a run and the project root that all
/// configured paths are relative to.
///
/// - An explicit path must exist.
/// - Without one, `Sitepipe.toml` in the working directory is used when
///   present; otherwise built-in defaults apply with the working directory
///   as root.
pub fn resolve_config(explicit: Option<&str>) -> Result<(ConfigFile, PathBuf)> {
    match explicit {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(SitepipeError::ConfigError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            let cfg = load_and_validate(&path)?;
            info!(config = %path.display(), "loaded config");
            Ok((cfg, config_root_dir(&path)))
        }
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                let cfg = load_and_validate(&path)?;
                info!(config = %path.display(), "loaded config");
                Ok((cfg, config_root_dir(&path)))
            } else {
                debug!("no {DEFAULT_CONFIG_FILE} found; using built-in defaults");
                Ok((ConfigFile::default(), config_root_dir(&path)))
            }
        }
    }
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current working
///   directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
