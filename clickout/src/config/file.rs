//! INI configuration file.
//!
//! ```ini
//! [download]
//! timeout_secs = 120
//! user_agent = clickout/0.1
//! max_depth = 16
//!
//! [output]
//! destination = /srv/mirror
//! ```
//!
//! Every key is optional; unknown keys are ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::debug;

use super::FetchConfig;
use crate::error::{ClickoutError, Result};

/// Path of the per-user configuration file, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("clickout").join("config.ini"))
}

/// Settings read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub max_depth: Option<usize>,
    pub destination: Option<PathBuf>,
}

impl ConfigFile {
    /// Load an explicitly requested file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClickoutError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::parse(&content)
    }

    /// Load the per-user file, falling back to defaults when it is absent.
    pub fn load_default() -> Result<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "Loaded configuration file");
                Self::parse(&content)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ClickoutError::Config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse INI content.
    pub fn parse(content: &str) -> Result<Self> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| ClickoutError::Config(format!("invalid config file: {}", e)))?;

        let mut config = Self::default();
        if let Some(download) = ini.section(Some("download")) {
            config.timeout_secs = number(download, "download", "timeout_secs")?;
            if config.timeout_secs == Some(0) {
                return Err(ClickoutError::Config(
                    "download.timeout_secs must be positive".to_string(),
                ));
            }
            config.user_agent = download.get("user_agent").map(str::to_string);
            config.max_depth = number(download, "download", "max_depth")?;
        }
        if let Some(output) = ini.section(Some("output")) {
            config.destination = output.get("destination").map(PathBuf::from);
        }
        Ok(config)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(destination) = &self.destination {
            config.destination = destination.clone();
        }
        config
    }
}

fn number<T: FromStr>(section: &Properties, name: &str, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    section
        .get(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| {
                ClickoutError::Config(format!("invalid {}.{} {:?}: {}", name, key, value, e))
            })
        })
        .transpose()
}
