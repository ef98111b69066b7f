//! In-memory registry backend

use async_trait::async_trait;
use bumpscout::domain::{VersionRecord, VersionSet};
use bumpscout::error::RegistryError;
use bumpscout::registry::{Backend, FetchOptions, RegistryClient};
use indexmap::IndexMap;
use semver::Version;
use std::collections::HashMap;

/// Registry answering from a fixed package table
#[derive(Default, Clone)]
pub struct StaticRegistry {
    packages: HashMap<String, Vec<VersionRecord>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a version; the last version added for a package is tagged latest
    pub fn publish(mut self, package: &str, version: &str, peers: &[(&str, &str)]) -> Self {
        let records = self.packages.entry(package.to_string()).or_default();
        for record in records.iter_mut() {
            record.tags.retain(|t| t != "latest");
        }
        records.push(
            VersionRecord::new(package, Version::parse(version).unwrap())
                .with_tag("latest")
                .with_peer_dependencies(peers.iter().copied()),
        );
        self
    }
}

#[async_trait]
impl RegistryClient for StaticRegistry {
    fn backend(&self) -> Backend {
        Backend::Npm
    }

    async fn fetch_versions(
        &self,
        package: &str,
        _current: Option<&str>,
        _options: &FetchOptions,
    ) -> Result<VersionSet, RegistryError> {
        match self.packages.get(package) {
            Some(records) => Ok(VersionSet::new(package, records.clone())),
            None => Err(RegistryError::not_found(package, "npm")),
        }
    }

    async fn list_installed(
        &self,
        _options: &FetchOptions,
    ) -> Result<IndexMap<String, Version>, RegistryError> {
        Ok(IndexMap::new())
    }
}
