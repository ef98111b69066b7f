//! Registry clients for fetching package version information
//!
//! This module provides:
//! - The [`RegistryClient`] contract the resolver depends on
//! - HTTP client shared foundation with opt-in retry logic
//! - npm backend (registry HTTP API, installed versions from node_modules)
//! - yarn backend (`yarn info`, installed versions from yarn.lock)

mod client;
mod command;
mod lockfile;
#[cfg(test)]
pub mod mock;
mod npm;
mod yarn;

pub use client::{HttpClient, DEFAULT_TIMEOUT};
pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use lockfile::{parse_yarn_lock, YARN_LOCKFILE};
pub use npm::{NpmClient, NpmConfig, DEFAULT_REGISTRY_URL};
pub use yarn::{YarnClient, YarnConfig, NO_LOCKFILE_MESSAGE};

use crate::domain::VersionSet;
use crate::error::{ConfigError, RegistryError};
use async_trait::async_trait;
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Supported package-manager backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Npm,
    Yarn,
}

impl Backend {
    /// Backend name as shown to users
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Npm => "npm",
            Backend::Yarn => "yarn",
        }
    }

    /// Command that creates the backend's install state
    pub fn install_command(&self) -> &'static str {
        match self {
            Backend::Npm => "npm install",
            Backend::Yarn => "yarn install",
        }
    }

    /// Picks the backend for a project directory: yarn when a yarn.lock is
    /// present, npm otherwise
    pub fn detect(cwd: &Path) -> Self {
        if cwd.join(YARN_LOCKFILE).exists() {
            Backend::Yarn
        } else {
            Backend::Npm
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "npm" => Ok(Backend::Npm),
            "yarn" => Ok(Backend::Yarn),
            _ => Err(ConfigError::InvalidPackageManager {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-query options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Project directory; backends never write to it
    pub cwd: PathBuf,
    /// Upper bound for a single query
    pub timeout: Duration,
    /// Query global packages instead of the project
    pub global: bool,
}

impl FetchOptions {
    /// Options for a project directory with default timeout
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            timeout: DEFAULT_TIMEOUT,
            global: false,
        }
    }

    /// Sets the per-query timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets global mode
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }
}

/// Contract over package-manager backends
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Backend this client talks to
    fn backend(&self) -> Backend;

    /// Fetch every known version of a package
    ///
    /// `current` is the declared specifier; backends may use it to scope
    /// their query.
    async fn fetch_versions(
        &self,
        package: &str,
        current: Option<&str>,
        options: &FetchOptions,
    ) -> Result<VersionSet, RegistryError>;

    /// List installed packages with their versions
    async fn list_installed(
        &self,
        options: &FetchOptions,
    ) -> Result<IndexMap<String, Version>, RegistryError>;

    /// Peer ranges declared by one specific version
    async fn fetch_peer_dependencies(
        &self,
        package: &str,
        version: &Version,
        options: &FetchOptions,
    ) -> Result<IndexMap<String, String>, RegistryError> {
        let set = self.fetch_versions(package, None, options).await?;
        Ok(set
            .get(version)
            .and_then(|record| record.peer_dependencies.clone())
            .unwrap_or_default())
    }
}

/// Settings needed to construct any backend
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub npm: NpmConfig,
    pub yarn: YarnConfig,
}

/// Create a registry client for the given backend
pub fn create_client(
    backend: Backend,
    config: &RegistryConfig,
) -> Result<Arc<dyn RegistryClient>, RegistryError> {
    let runner = Arc::new(SystemCommandRunner::new());
    match backend {
        Backend::Npm => Ok(Arc::new(NpmClient::new(config.npm.clone(), runner)?)),
        Backend::Yarn => Ok(Arc::new(YarnClient::new(config.yarn.clone(), runner))),
    }
}

/// Turns the many ways package metadata spells a repository into a browsable URL
pub fn normalize_repository_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(path) = raw.strip_prefix("github:") {
        return Some(format!("https://github.com/{}", path));
    }
    if !raw.contains(':') && raw.split('/').count() == 2 {
        return Some(format!("https://github.com/{}", raw));
    }

    let url = raw.strip_prefix("git+").unwrap_or(raw);
    let url = if let Some(rest) = url.strip_prefix("git://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ssh://git@") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("git@") {
        format!("https://{}", rest.replacen(':', "/", 1))
    } else {
        url.to_string()
    };
    Some(url.trim_end_matches(".git").to_string())
}
