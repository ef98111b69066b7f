//! In-memory registry client for unit tests

use super::{Backend, FetchOptions, RegistryClient};
use crate::domain::{VersionRecord, VersionSet};
use crate::error::RegistryError;
use async_trait::async_trait;
use indexmap::IndexMap;
use semver::Version;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Registry answering from canned data
#[derive(Default, Clone)]
pub struct MockRegistry {
    versions: HashMap<String, Vec<VersionRecord>>,
    errors: HashMap<String, RegistryError>,
    installed: IndexMap<String, Version>,
    installed_error: Option<RegistryError>,
    delays: HashMap<String, Duration>,
    peer_delays: HashMap<String, Duration>,
    peer_panics: HashSet<String>,
    installed_delay: Option<Duration>,
    installed_calls: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package with the given records
    pub fn with_versions(mut self, package: &str, records: Vec<VersionRecord>) -> Self {
        self.versions.insert(package.to_string(), records);
        self
    }

    /// Adds a package from plain version strings, tagging the highest as latest
    pub fn with_package(self, package: &str, versions: &[&str]) -> Self {
        let mut records: Vec<VersionRecord> = versions
            .iter()
            .map(|v| {
                VersionRecord::new(package, Version::parse(v).unwrap())
                    .with_peer_dependencies(Vec::<(String, String)>::new())
            })
            .collect();
        if let Some(last) = records.last_mut() {
            last.tags.push("latest".to_string());
        }
        self.with_versions(package, records)
    }

    /// Makes every query for `package` fail
    pub fn with_error(mut self, package: &str, error: RegistryError) -> Self {
        self.errors.insert(package.to_string(), error);
        self
    }

    /// Adds an installed package
    pub fn with_installed(mut self, package: &str, version: &str) -> Self {
        self.installed
            .insert(package.to_string(), Version::parse(version).unwrap());
        self
    }

    /// Makes `list_installed` fail
    pub fn with_installed_error(mut self, error: RegistryError) -> Self {
        self.installed_error = Some(error);
        self
    }

    /// Delays every query for `package`
    pub fn with_delay(mut self, package: &str, delay: Duration) -> Self {
        self.delays.insert(package.to_string(), delay);
        self
    }

    /// Delays peer lookups for `package`
    pub fn with_peer_delay(mut self, package: &str, delay: Duration) -> Self {
        self.peer_delays.insert(package.to_string(), delay);
        self
    }

    /// Makes the peer lookup task for `package` panic
    pub fn with_peer_panic(mut self, package: &str) -> Self {
        self.peer_panics.insert(package.to_string());
        self
    }

    /// Delays `list_installed`
    pub fn with_installed_delay(mut self, delay: Duration) -> Self {
        self.installed_delay = Some(delay);
        self
    }

    /// Number of `list_installed` calls so far
    pub fn installed_count(&self) -> usize {
        self.installed_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_versions` calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for MockRegistry {
    fn backend(&self) -> Backend {
        Backend::Npm
    }

    async fn fetch_versions(
        &self,
        package: &str,
        _current: Option<&str>,
        _options: &FetchOptions,
    ) -> Result<VersionSet, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(package) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.errors.get(package) {
            return Err(error.clone());
        }
        match self.versions.get(package) {
            Some(records) => Ok(VersionSet::new(package, records.clone())),
            None => Err(RegistryError::not_found(package, "npm")),
        }
    }

    async fn list_installed(
        &self,
        _options: &FetchOptions,
    ) -> Result<IndexMap<String, Version>, RegistryError> {
        self.installed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.installed_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.installed_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.installed.clone()),
        }
    }

    async fn fetch_peer_dependencies(
        &self,
        package: &str,
        version: &Version,
        options: &FetchOptions,
    ) -> Result<IndexMap<String, String>, RegistryError> {
        if self.peer_panics.contains(package) {
            panic!("peer lookup for {} crashed", package);
        }
        if let Some(delay) = self.peer_delays.get(package) {
            tokio::time::sleep(*delay).await;
        }
        let set = self.fetch_versions(package, None, options).await?;
        Ok(set
            .get(version)
            .and_then(|record| record.peer_dependencies.clone())
            .unwrap_or_default())
    }
}
