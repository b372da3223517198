//! Server startup settings: `campus.toml` and the tracing subscriber.

use std::path::{Path, PathBuf};

use store::CampusConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Overrides the location of `campus.toml`.
pub const CONFIG_PATH_VAR: &str = "CAMPUS_CONFIG";

const DEFAULT_FILTER: &str = "info,web=debug";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CampusConfig::filename()))
}

/// Load the config at `path`; a missing file means defaults.
pub fn load_config(path: &Path) -> Result<CampusConfig, SettingsError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(CampusConfig::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    CampusConfig::from_toml(&text).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Install the global subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
