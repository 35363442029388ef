use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

const APP_DIR: &str = "showmyslskd";
const CONFIG_FILE: &str = "config.toml";

/// Database locations remembered between runs
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// slskd database to import from
    pub input_db: Option<String>,
    /// Reporting database to import into and query
    pub output_db: Option<String>,
}

impl AppConfig {
    pub fn new(input_db: impl Into<String>, output_db: impl Into<String>) -> Self {
        Self {
            input_db: Some(input_db.into()),
            output_db: Some(output_db.into()),
        }
    }

    pub fn input_db(&self) -> Result<&Path> {
        non_empty(&self.input_db).ok_or(Error::ConfigurationMissing("input_db"))
    }

    pub fn output_db(&self) -> Result<&Path> {
        non_empty(&self.output_db).ok_or(Error::ConfigurationMissing("output_db"))
    }

    /// Both paths are set
    pub fn is_complete(&self) -> bool {
        self.input_db().is_ok() && self.output_db().is_ok()
    }
}

fn non_empty(value: &Option<String>) -> Option<&Path> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(Path::new)
}

/// `<user config dir>/showmyslskd/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(Error::NoConfigDirectory)?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// Load the config at `path` (or the default location); defaults when absent
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Write the config, creating its directory on first save
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
