//! Project configuration file
//!
//! Reads `.bumpscoutrc.toml` from the project directory, or the file given
//! with `--config`. Every key is optional; command-line flags win over the
//! file when both are given.
//!
//! ```toml
//! target = "minor"
//! peer = true
//! exclude = ["typescript"]
//! dep = ["prod", "dev"]
//! packageManager = "yarn"
//! timeout = 10000
//!
//! [targetFor]
//! react = "patch"
//! ```

use crate::domain::UpgradePolicy;
use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const RC_FILE_NAME: &str = ".bumpscoutrc.toml";

/// Settings read from the configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RcConfig {
    pub target: Option<UpgradePolicy>,
    pub peer: Option<bool>,
    pub pre: Option<bool>,
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub only: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub dep: Vec<String>,
    pub package_manager: Option<String>,
    pub registry: Option<String>,
    pub concurrency: Option<usize>,
    /// Per-query timeout in milliseconds
    pub timeout: Option<u64>,
    pub retry: Option<u32>,
    pub peer_iterations: Option<usize>,
    pub tolerate_conflicts: Option<bool>,
    #[serde(default)]
    pub format: Vec<String>,
    /// Minimum release age such as `2w` or `10d`
    pub age: Option<String>,
    #[serde(default)]
    pub target_for: IndexMap<String, UpgradePolicy>,
}

impl RcConfig {
    /// Parse configuration text; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Load the configuration for a project
    ///
    /// An explicit path must exist. Without one, a missing
    /// `.bumpscoutrc.toml` in `dir` simply yields `None`.
    pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => dir.join(RC_FILE_NAME),
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => Ok(None),
            Err(e) => Err(ConfigError::InvalidConfigFile {
                path,
                message: e.to_string(),
            }),
        }
    }
}
