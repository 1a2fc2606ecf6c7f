use crate::error::{GmError, Result};
use crate::utils::fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://dl.google.com/go";
pub const DEFAULT_LATEST_VERSION_URL: &str = "https://go.dev/VERSION?m=text";

/// Name of the alias pointing at the active toolchain inside `versions/`.
pub const CURRENT_ALIAS: &str = "current";

/// Sentinel written last into a version directory once its install completed.
pub const INSTALL_SUCCESS_MARKER: &str = ".install-success";

const GM_DIR: &str = ".gm";
const HOME_ENV: &str = "GM_HOME";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub root_dir: PathBuf,
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,
    #[serde(default = "default_latest_version_url")]
    pub latest_version_url: String,
    #[serde(default)]
    pub github_api_token: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self> {
        let mut config = Self::with_root(get_root_dir()?);
        config.github_api_token = std::env::var("GITHUB_TOKEN").ok();
        Ok(config)
    }

    /// In-memory configuration rooted at `root_dir`, with upstream defaults.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Config {
            root_dir: root_dir.into(),
            download_base_url: default_download_base_url(),
            latest_version_url: default_latest_version_url(),
            github_api_token: None,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let config = Self::new()?;
            config.save()?;
            fs::ensure_dir_exists(&config.versions_dir())?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            GmError::config_error(format!("{}: {e}", config_path.display()))
        })?;

        if let Ok(home) = std::env::var(HOME_ENV) {
            config.root_dir = PathBuf::from(home);
        }
        if config.github_api_token.is_none() {
            config.github_api_token = std::env::var("GITHUB_TOKEN").ok();
        }

        fs::ensure_dir_exists(&config.versions_dir())?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::ensure_dir_exists(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root_dir.join("versions")
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    pub fn install_marker(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(INSTALL_SUCCESS_MARKER)
    }

    pub fn current_path(&self) -> PathBuf {
        self.versions_dir().join(CURRENT_ALIAS)
    }

    /// `bin/` of whichever toolchain the current alias selects.
    pub fn goroot_bin_dir(&self) -> PathBuf {
        self.current_path().join("bin")
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.root_dir.join("workspace")
    }

    pub fn workspace_bin_dir(&self) -> PathBuf {
        self.workspace_dir().join("bin")
    }

    pub fn is_installed(&self, version: &str) -> bool {
        is_marked(&self.version_dir(version))
    }
}

/// True when `dir` carries the install success marker.
pub fn is_marked(dir: &Path) -> bool {
    dir.join(INSTALL_SUCCESS_MARKER).is_file()
}

fn default_download_base_url() -> String {
    DEFAULT_DOWNLOAD_BASE_URL.to_string()
}

fn default_latest_version_url() -> String {
    DEFAULT_LATEST_VERSION_URL.to_string()
}

fn get_root_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(GM_DIR))
        .ok_or(GmError::HomeDirectoryNotFound)
}

fn get_config_path() -> Result<PathBuf> {
    Ok(get_root_dir()?.join("config.json"))
}
