//! Loading and writing the controller configuration file
//!
//! A missing or unparseable file falls back to [`RawControllerConfig::default`]. A file
//! that parses but does not validate is an error: startup should stop rather than run
//! with a half-understood mapping.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ControllerConfig, RawControllerConfig};
use crate::mapping::MappingError;

const CONFIG_DIR: &str = "combowatch";
const CONTROLLER_CONFIG_FILE: &str = "controller_config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file {path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] MappingError),
}

/// `<config dir>/combowatch/controller_config.toml`, falling back to the home directory
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| {
        warn!("No config directory found, using home directory");
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    });
    path.push(CONFIG_DIR);
    path.push(CONTROLLER_CONFIG_FILE);
    path
}

/// Read and parse the file without any fallback
pub async fn read_raw_config(path: &Path) -> Result<RawControllerConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the file, falling back to the built-in default when it is absent or malformed
pub async fn load_raw_or_default(path: &Path) -> RawControllerConfig {
    match read_raw_config(path).await {
        Ok(raw) => {
            info!("Loaded controller config from {}", path.display());
            raw
        }
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Config file {} not found, using default configuration",
                path.display()
            );
            RawControllerConfig::default()
        }
        Err(e) => {
            warn!("{}", e);
            warn!("Using default configuration");
            RawControllerConfig::default()
        }
    }
}

/// Load and validate the controller configuration
pub async fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let raw = load_raw_or_default(path).await;
    debug!("Raw controller config: {:?}", raw);
    let config = ControllerConfig::try_from(raw)?;
    Ok(config)
}

/// Write `raw` as pretty TOML, creating parent directories
pub async fn write_config(
    path: &Path,
    raw: &RawControllerConfig,
    overwrite: bool,
) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !overwrite && tokio::fs::try_exists(path).await.map_err(io_err)? {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let content = toml::to_string_pretty(raw)?;
    tokio::fs::write(path, content).await.map_err(io_err)?;

    info!("Controller config written to {}", path.display());
    Ok(())
}
