//! yarn backend
//!
//! Versions come from `yarn info <package> --json`. Unlike the npm registry
//! document, yarn only reports the manifest fields of one version (the
//! highest matching the queried range), so peer dependencies of other
//! versions are looked up on demand with `yarn info <package>@<version>`.
//! Installed versions require a yarn.lock; without one every listing fails
//! with [`NO_LOCKFILE_MESSAGE`].

use super::npm::{deprecation_message, Repository};
use super::{parse_yarn_lock, Backend, CommandRunner, FetchOptions, RegistryClient, YARN_LOCKFILE};
use crate::domain::{is_external, VersionRecord, VersionSet};
use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use semver::Version;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Error shown when listing installed packages without a lockfile
pub const NO_LOCKFILE_MESSAGE: &str =
    "No lockfile in this directory. Run `yarn install` to generate one.";

/// Construction settings for [`YarnClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YarnConfig {
    /// Executable to run
    pub command: String,
}

impl Default for YarnConfig {
    fn default() -> Self {
        Self {
            command: "yarn".to_string(),
        }
    }
}

/// One line of `yarn --json` output
#[derive(Debug, Deserialize)]
struct YarnMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YarnInfo {
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    time: HashMap<String, String>,
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    repository: Option<Repository>,
    /// The version whose manifest fields are reported below
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    peer_dependencies: Option<IndexMap<String, String>>,
    #[serde(default)]
    deprecated: Option<serde_json::Value>,
}

/// yarn backend
pub struct YarnClient {
    config: YarnConfig,
    runner: Arc<dyn CommandRunner>,
}

impl YarnClient {
    /// Create a new yarn client
    pub fn new(config: YarnConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Runs `yarn info <query> [field] --json` and returns the inspect payload
    async fn info(
        &self,
        package: &str,
        query: &str,
        field: Option<&str>,
        options: &FetchOptions,
    ) -> Result<serde_json::Value, RegistryError> {
        let mut args = vec!["info".to_string(), query.to_string()];
        if let Some(field) = field {
            args.push(field.to_string());
        }
        args.push("--json".to_string());

        let output = self
            .runner
            .run(&self.config.command, &args, &options.cwd)
            .await
            .map_err(|e| RegistryError::unavailable(package, "yarn", format!("failed to run yarn: {}", e)))?;

        let mut inspect = None;
        let mut errors = Vec::new();
        for line in output.stdout.lines().chain(output.stderr.lines()) {
            let Ok(message) = serde_json::from_str::<YarnMessage>(line) else {
                continue;
            };
            match message.kind.as_str() {
                "inspect" => inspect = Some(message.data),
                "error" => errors.push(message.data.as_str().unwrap_or_default().to_string()),
                _ => {}
            }
        }

        if let Some(error) = errors.first() {
            if errors.iter().any(|e| e.contains("Not found") || e.contains("404")) {
                return Err(RegistryError::not_found(package, "yarn"));
            }
            return Err(RegistryError::unavailable(package, "yarn", error.clone()));
        }

        match inspect {
            Some(data) => Ok(data),
            None if output.success => Ok(serde_json::Value::Null),
            None => Err(RegistryError::unavailable(
                package,
                "yarn",
                output.stderr.trim().to_string(),
            )),
        }
    }
}

/// Whether `current` can narrow a `yarn info` query
fn scoped_query(package: &str, current: Option<&str>) -> String {
    match current.map(str::trim) {
        Some(range)
            if !range.is_empty()
                && range != "*"
                && !range.starts_with("npm:")
                && !is_external(range)
                && !range.contains(char::is_whitespace) =>
        {
            format!("{}@{}", package, range)
        }
        _ => package.to_string(),
    }
}

#[async_trait]
impl RegistryClient for YarnClient {
    fn backend(&self) -> Backend {
        Backend::Yarn
    }

    async fn fetch_versions(
        &self,
        package: &str,
        current: Option<&str>,
        options: &FetchOptions,
    ) -> Result<VersionSet, RegistryError> {
        let query = scoped_query(package, current);
        let data = self.info(package, &query, None, options).await?;
        let info: YarnInfo = serde_json::from_value(data).map_err(|e| {
            RegistryError::unavailable(package, "yarn", format!("unexpected yarn info output: {}", e))
        })?;

        let repository = info.repository.as_ref().and_then(Repository::url);
        let mut records = Vec::with_capacity(info.versions.len());
        for raw in &info.versions {
            let Ok(version) = Version::parse(raw) else {
                debug!(package, version = %raw, "ignoring non-semver version");
                continue;
            };
            let mut record = VersionRecord::new(package, version);
            record.published_at = info
                .time
                .get(raw)
                .and_then(|t| t.parse::<DateTime<Utc>>().ok());
            record.repository = repository.clone();
            let mut tags: Vec<String> = info
                .dist_tags
                .iter()
                .filter(|(_, v)| *v == raw)
                .map(|(tag, _)| tag.clone())
                .collect();
            tags.sort();
            record.tags = tags;
            if info.version.as_deref() == Some(raw.as_str()) {
                record.peer_dependencies = Some(info.peer_dependencies.clone().unwrap_or_default());
                record.deprecated = deprecation_message(info.deprecated.as_ref());
            }
            records.push(record);
        }

        Ok(VersionSet::new(package, records))
    }

    async fn list_installed(
        &self,
        options: &FetchOptions,
    ) -> Result<IndexMap<String, Version>, RegistryError> {
        if options.global {
            return Err(RegistryError::precondition(
                "yarn",
                "Listing global packages is not supported with yarn. Use --packageManager npm.",
            ));
        }

        let path = options.cwd.join(YARN_LOCKFILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(parse_yarn_lock(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RegistryError::precondition("yarn", NO_LOCKFILE_MESSAGE))
            }
            Err(e) => Err(RegistryError::precondition(
                "yarn",
                format!("Cannot read {}: {}", path.display(), e),
            )),
        }
    }

    async fn fetch_peer_dependencies(
        &self,
        package: &str,
        version: &Version,
        options: &FetchOptions,
    ) -> Result<IndexMap<String, String>, RegistryError> {
        let query = format!("{}@{}", package, version);
        let data = self
            .info(package, &query, Some("peerDependencies"), options)
            .await?;
        if data.is_null() {
            return Ok(IndexMap::new());
        }
        serde_json::from_value(data).map_err(|e| {
            RegistryError::unavailable(package, "yarn", format!("unexpected peerDependencies: {}", e))
        })
    }
}
