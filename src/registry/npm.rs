//! npm backend
//!
//! Versions come from the registry HTTP API (`{registry}/{package}`), which
//! carries per-version peer dependencies, publish times and the `dist-tags`
//! field used to determine "latest". Installed versions are read from
//! `node_modules/*/package.json`; global ones from `npm ls -g`.

use super::{
    normalize_repository_url, Backend, CommandRunner, FetchOptions, HttpClient, RegistryClient,
    DEFAULT_TIMEOUT,
};
use crate::domain::{VersionRecord, VersionSet};
use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use semver::Version;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// npm registry base URL
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Construction settings for [`NpmClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmConfig {
    /// Registry base URL
    pub registry_url: String,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Retries for transient HTTP failures
    pub retries: u32,
    /// Executable used for `npm ls -g`
    pub command: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            command: "npm".to_string(),
        }
    }
}

impl NpmConfig {
    /// Sets the registry base URL
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Full package document ("packument") returned by the registry
#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(default)]
    versions: HashMap<String, PackumentVersion>,
    #[serde(default)]
    time: HashMap<String, String>,
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackumentVersion {
    #[serde(default)]
    peer_dependencies: Option<IndexMap<String, String>>,
    #[serde(default)]
    deprecated: Option<serde_json::Value>,
    #[serde(default)]
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Repository {
    Url(String),
    Object { url: String },
}

impl Repository {
    pub(crate) fn url(&self) -> Option<String> {
        match self {
            Repository::Url(url) | Repository::Object { url } => normalize_repository_url(url),
        }
    }
}

/// Deprecation may be a message, `true`, or `false`/empty for "not deprecated"
pub(crate) fn deprecation_message(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(message) if !message.is_empty() => Some(message.clone()),
        serde_json::Value::Bool(true) => Some("deprecated".to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct NpmLsOutput {
    #[serde(default)]
    dependencies: IndexMap<String, NpmLsEntry>,
}

#[derive(Debug, Deserialize)]
struct NpmLsEntry {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstalledManifest {
    name: Option<String>,
    version: Option<String>,
}

/// npm backend
pub struct NpmClient {
    client: HttpClient,
    config: NpmConfig,
    runner: Arc<dyn CommandRunner>,
}

impl NpmClient {
    /// Create a new npm client
    pub fn new(config: NpmConfig, runner: Arc<dyn CommandRunner>) -> Result<Self, RegistryError> {
        let client = HttpClient::with_config(
            config.timeout,
            concat!("bumpscout/", env!("CARGO_PKG_VERSION")),
        )?
        .with_max_retries(config.retries);
        Ok(Self {
            client,
            config,
            runner,
        })
    }

    /// Build the URL for a package
    fn build_url(&self, package: &str) -> String {
        format!(
            "{}/{}",
            self.config.registry_url,
            encode_package_name(package)
        )
    }

    async fn list_global(&self, options: &FetchOptions) -> Result<IndexMap<String, Version>, RegistryError> {
        let args = ["ls", "-g", "--depth=0", "--json"].map(String::from);
        let output = self
            .runner
            .run(&self.config.command, &args, &options.cwd)
            .await
            .map_err(|e| RegistryError::unavailable("", "npm", format!("failed to run npm: {}", e)))?;

        // npm ls exits non-zero on peer problems but still prints the tree
        let parsed: NpmLsOutput = serde_json::from_str(&output.stdout).map_err(|e| {
            RegistryError::unavailable(
                "",
                "npm",
                format!("unexpected output from npm ls: {} {}", e, output.stderr.trim()),
            )
        })?;

        Ok(parsed
            .dependencies
            .into_iter()
            .filter_map(|(name, entry)| {
                let version = Version::parse(entry.version.as_deref()?).ok()?;
                Some((name, version))
            })
            .collect())
    }
}

/// Encode package name for URL (handles scoped packages)
fn encode_package_name(package: &str) -> String {
    if package.starts_with('@') {
        package.replace('/', "%2F")
    } else {
        package.to_string()
    }
}

async fn read_node_modules(cwd: &Path) -> IndexMap<String, Version> {
    let mut installed = IndexMap::new();
    let root = cwd.join("node_modules");
    let Ok(mut entries) = tokio::fs::read_dir(&root).await else {
        return installed;
    };

    let mut package_dirs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') {
            if let Ok(mut scoped) = tokio::fs::read_dir(entry.path()).await {
                while let Ok(Some(member)) = scoped.next_entry().await {
                    package_dirs.push(member.path());
                }
            }
        } else {
            package_dirs.push(entry.path());
        }
    }

    for dir in package_dirs {
        let Ok(content) = tokio::fs::read_to_string(dir.join("package.json")).await else {
            continue;
        };
        match serde_json::from_str::<InstalledManifest>(&content) {
            Ok(InstalledManifest {
                name: Some(name),
                version: Some(version),
            }) => {
                if let Ok(version) = Version::parse(&version) {
                    installed.insert(name, version);
                }
            }
            Ok(_) => {}
            Err(e) => debug!(path = %dir.display(), "skipping unreadable package.json: {}", e),
        }
    }

    installed.sort_keys();
    installed
}

#[async_trait]
impl RegistryClient for NpmClient {
    fn backend(&self) -> Backend {
        Backend::Npm
    }

    async fn fetch_versions(
        &self,
        package: &str,
        _current: Option<&str>,
        _options: &FetchOptions,
    ) -> Result<VersionSet, RegistryError> {
        let url = self.build_url(package);
        let packument: Packument = self.client.get_json(&url, package, "npm").await?;

        let mut tags_by_version: HashMap<&str, Vec<String>> = HashMap::new();
        for (tag, version) in &packument.dist_tags {
            tags_by_version
                .entry(version.as_str())
                .or_default()
                .push(tag.clone());
        }
        let package_repository = packument.repository.as_ref().and_then(Repository::url);

        let mut records = Vec::with_capacity(packument.versions.len());
        for (raw, meta) in &packument.versions {
            let version = match Version::parse(raw) {
                Ok(version) => version,
                Err(_) => {
                    debug!(package, version = %raw, "ignoring non-semver version");
                    continue;
                }
            };

            let mut record = VersionRecord::new(package, version);
            record.published_at = packument
                .time
                .get(raw)
                .and_then(|t| t.parse::<DateTime<Utc>>().ok());
            record.repository = meta
                .repository
                .as_ref()
                .and_then(Repository::url)
                .or_else(|| package_repository.clone());
            let mut tags = tags_by_version.get(raw.as_str()).cloned().unwrap_or_default();
            tags.sort();
            record.tags = tags;
            // The packument is complete, so a missing field means "no peers"
            record.peer_dependencies = Some(meta.peer_dependencies.clone().unwrap_or_default());
            record.deprecated = deprecation_message(meta.deprecated.as_ref());
            records.push(record);
        }

        if records.is_empty() && !packument.versions.is_empty() {
            warn!(package, "registry lists no valid semver versions");
        }

        Ok(VersionSet::new(package, records))
    }

    async fn list_installed(
        &self,
        options: &FetchOptions,
    ) -> Result<IndexMap<String, Version>, RegistryError> {
        if options.global {
            return self.list_global(options).await;
        }
        Ok(read_node_modules(&options.cwd).await)
    }
}
