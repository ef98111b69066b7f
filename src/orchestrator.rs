//! Upgrade orchestrator for coordinating one resolution run
//!
//! This module provides:
//! - Workflow coordination: dedupe → filter → list installed → fetch → select → [peers]
//! - Parallel registry queries bounded by a semaphore, each under a timeout
//! - Cancellation that returns the results gathered so far, marked partial
//! - Error handling with partial continuation: per-package problems are
//!   recorded in the result, run-level problems are returned as errors

use crate::cancel::CancelSignal;
use crate::domain::{
    is_external, Declaration, Distance, IssueKind, PolicyConfig, ResolutionResult, Specifier,
    Upgrade, VersionSet,
};
use crate::error::{AppError, RegistryError, ResolveError};
use crate::progress::Progress;
use crate::registry::{FetchOptions, RegistryClient};
use crate::update::{
    PeerPackage, PeerResolver, PeerState, Target, VersionSelector, DEFAULT_PEER_ITERATIONS,
};
use indexmap::IndexMap;
use semver::Version;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default concurrency limit for registry requests
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Default and per-package upgrade policies
    pub policy: PolicyConfig,
    /// Resolve peer ranges across the whole set
    pub peer: bool,
    /// Maximum concurrent registry queries
    pub concurrency: usize,
    /// Working directory, timeout and global mode for backend queries
    pub fetch: FetchOptions,
    /// Fixpoint iteration budget in peer mode
    pub peer_iterations: usize,
    /// Keep going when peer ranges conflict
    pub tolerate_conflicts: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl RunOptions {
    pub fn new(fetch: FetchOptions) -> Self {
        Self {
            policy: PolicyConfig::default(),
            peer: false,
            concurrency: DEFAULT_CONCURRENCY,
            fetch,
            peer_iterations: DEFAULT_PEER_ITERATIONS,
            tolerate_conflicts: false,
            show_progress: false,
        }
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_peer(mut self, peer: bool) -> Self {
        self.peer = peer;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_peer_iterations(mut self, iterations: usize) -> Self {
        self.peer_iterations = iterations;
        self
    }

    pub fn with_tolerate_conflicts(mut self, tolerate: bool) -> Self {
        self.tolerate_conflicts = tolerate;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// A declaration that passed filtering and parsing
#[derive(Debug, Clone)]
struct Pending {
    declaration: Declaration,
    specifier: Specifier,
}

/// A declaration together with the versions its backend reported
#[derive(Debug, Clone)]
struct Fetched {
    declaration: Declaration,
    specifier: Specifier,
    versions: VersionSet,
}

/// Orchestrator for coordinating a resolution run
pub struct Orchestrator {
    client: Arc<dyn RegistryClient>,
    selector: VersionSelector,
    options: RunOptions,
    cancel: CancelSignal,
    installed: Option<IndexMap<String, Version>>,
}

impl Orchestrator {
    /// Create a new orchestrator that cannot be cancelled
    pub fn new(
        client: Arc<dyn RegistryClient>,
        selector: VersionSelector,
        options: RunOptions,
    ) -> Self {
        Self {
            client,
            selector,
            options,
            cancel: CancelSignal::never(),
            installed: None,
        }
    }

    /// Observe a cancellation signal during the run
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reuse an installed-package listing instead of asking the backend again
    pub fn with_installed(mut self, installed: IndexMap<String, Version>) -> Self {
        self.installed = Some(installed);
        self
    }

    /// List installed packages under the query timeout
    ///
    /// Returns `None` when the run is cancelled before the listing completes.
    pub async fn list_installed(&self) -> Result<Option<IndexMap<String, Version>>, AppError> {
        let timeout = self.options.fetch.timeout;
        let listing = tokio::time::timeout(timeout, self.client.list_installed(&self.options.fetch));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("run cancelled while listing installed packages");
                Ok(None)
            }
            listing = listing => match listing {
                Ok(installed) => Ok(Some(installed?)),
                Err(_) => Err(RegistryError::unavailable(
                    "installed packages",
                    self.client.backend().name(),
                    format!("timed out after {:?}", timeout),
                )
                .into()),
            },
        }
    }

    /// Resolve upgrades for a list of declarations
    ///
    /// Fails only on run-level problems: an unusable backend, a peer cycle,
    /// or a peer conflict when conflicts are not tolerated.
    pub async fn run(&self, declarations: &[Declaration]) -> Result<ResolutionResult, AppError> {
        let mut result = ResolutionResult::new();
        let mut progress = Progress::new(self.options.show_progress);

        let pending = self.prepare(declarations, &mut result);
        if pending.is_empty() {
            return Ok(result);
        }

        let installed = match &self.installed {
            Some(installed) => installed.clone(),
            None => {
                progress.spinner("Listing installed packages...");
                let listing = self.list_installed().await;
                progress.finish_and_clear();
                match listing? {
                    Some(installed) => installed,
                    None => {
                        result.partial = true;
                        for entry in &pending {
                            result.mark_incomplete(entry.declaration.name.as_str());
                        }
                        return Ok(result);
                    }
                }
            }
        };
        debug!(count = installed.len(), backend = %self.client.backend(), "listed installed packages");

        progress.start(pending.len() as u64, "Checking dependencies");
        let fetched = self
            .fetch_all(pending, &installed, &mut result, &progress)
            .await?;
        progress.finish_and_clear();

        if self.options.peer && !result.partial {
            self.resolve_with_peers(fetched, &mut result).await?;
        } else {
            for entry in &fetched {
                self.resolve_independently(entry, &mut result);
            }
        }

        info!(
            upgrades = result.upgrades.len(),
            warnings = result.warnings.len(),
            errors = result.errors.len(),
            partial = result.partial,
            "resolution finished"
        );
        Ok(result)
    }

    /// Dedupe, filter and parse declarations
    fn prepare(&self, declarations: &[Declaration], result: &mut ResolutionResult) -> Vec<Pending> {
        let filter = self.selector.filter();
        let mut pending = Vec::new();

        for declaration in dedupe(declarations, result) {
            if !filter.should_process_section(declaration.section)
                || !filter.should_process_package(&declaration.name)
            {
                debug!(package = %declaration.name, "filtered out");
                continue;
            }
            if let Some(message) = invalid_name(&declaration.name) {
                result.error(declaration.name.as_str(), IssueKind::InvalidName, message);
                continue;
            }
            if is_external(&declaration.specifier) {
                debug!(package = %declaration.name, specifier = %declaration.specifier, "not a registry dependency");
                continue;
            }
            match Specifier::parse(&declaration.specifier) {
                Ok(specifier) => pending.push(Pending {
                    declaration,
                    specifier,
                }),
                Err(source) => {
                    let error = ResolveError::InvalidSpecifier {
                        package: declaration.name.clone(),
                        source,
                    };
                    warn!("{}", error);
                    result.error(declaration.name.as_str(), IssueKind::InvalidSpecifier, error.to_string());
                }
            }
        }

        pending
    }

    /// Query the backend for every pending declaration concurrently
    ///
    /// Returns in declaration order. On cancellation, outstanding queries are
    /// aborted, their packages marked incomplete and the result marked partial.
    async fn fetch_all(
        &self,
        pending: Vec<Pending>,
        installed: &IndexMap<String, Version>,
        result: &mut ResolutionResult,
        progress: &Progress,
    ) -> Result<Vec<Fetched>, AppError> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, entry) in pending.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let options = self.options.fetch.clone();
            let query = entry
                .specifier
                .query_name(&entry.declaration.name)
                .to_string();
            let current = entry.declaration.specifier.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let timeout = options.timeout;
                let fetch = client.fetch_versions(&query, Some(&current), &options);
                let outcome = match tokio::time::timeout(timeout, fetch).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RegistryError::unavailable(
                        &query,
                        client.backend().name(),
                        format!("timed out after {:?}", timeout),
                    )),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<VersionSet>> = vec![None; pending.len()];
        let mut done = vec![false; pending.len()];

        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tasks.abort_all();
                    result.partial = true;
                    warn!("run cancelled; returning partial results");
                    break;
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            let (index, outcome) = match joined {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(%error, "registry task failed");
                    continue;
                }
            };
            done[index] = true;
            let name = &pending[index].declaration.name;
            progress.finished(name);

            match outcome {
                Ok(versions) => {
                    debug!(package = %name, versions = versions.len(), "fetched versions");
                    slots[index] = Some(versions.with_installed(installed.get(name).cloned()));
                }
                Err(error @ RegistryError::NotFound { .. }) => {
                    warn!("{}", error);
                    result.warn(name.as_str(), IssueKind::NotFound, error.to_string());
                }
                Err(error @ RegistryError::BackendUnavailable { .. }) => {
                    warn!("{}", error);
                    result.error(name.as_str(), IssueKind::BackendUnavailable, error.to_string());
                    result.mark_incomplete(name.as_str());
                }
                Err(error @ RegistryError::BackendPrecondition { .. }) => {
                    tasks.abort_all();
                    return Err(error.into());
                }
            }
        }

        for (index, entry) in pending.iter().enumerate() {
            if !done[index] {
                result.mark_incomplete(entry.declaration.name.as_str());
            }
        }

        Ok(pending
            .into_iter()
            .zip(slots)
            .filter_map(|(entry, versions)| {
                versions.map(|versions| Fetched {
                    declaration: entry.declaration,
                    specifier: entry.specifier,
                    versions,
                })
            })
            .collect())
    }

    fn resolve_independently(&self, entry: &Fetched, result: &mut ResolutionResult) {
        let policy = self.options.policy.policy_for(&entry.declaration.name);
        if let Some(target) = self.selector.select_target(&entry.specifier, &entry.versions, policy) {
            result.insert(build_upgrade(entry, target));
        }
    }

    async fn resolve_with_peers(
        &self,
        fetched: Vec<Fetched>,
        result: &mut ResolutionResult,
    ) -> Result<(), AppError> {
        let mut packages: IndexMap<String, PeerPackage> = fetched
            .iter()
            .map(|entry| {
                (
                    entry.declaration.name.clone(),
                    PeerPackage {
                        query_name: entry.specifier.query_name(&entry.declaration.name).to_string(),
                        specifier: entry.specifier.clone(),
                        policy: self.options.policy.policy_for(&entry.declaration.name).clone(),
                        versions: entry.versions.clone(),
                    },
                )
            })
            .collect();

        let resolver = PeerResolver::new(&self.selector, Arc::clone(&self.client), self.options.fetch.clone())
            .with_max_iterations(self.options.peer_iterations)
            .with_tolerate_conflicts(self.options.tolerate_conflicts)
            .with_concurrency(self.options.concurrency);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = resolver.resolve(&mut packages) => Some(outcome),
        };

        let Some(outcome) = outcome else {
            warn!("run cancelled during peer resolution; returning unconstrained results");
            result.partial = true;
            for entry in &fetched {
                self.resolve_independently(entry, result);
                result.mark_incomplete(entry.declaration.name.as_str());
            }
            return Ok(());
        };
        let outcome = outcome?;
        debug!(iterations = outcome.iterations, "peer resolution done");

        result.warnings.extend(outcome.warnings);
        for package in outcome.incomplete {
            result.mark_incomplete(package);
        }

        for entry in &fetched {
            let Some(version) = outcome
                .states
                .get(&entry.declaration.name)
                .and_then(PeerState::version)
            else {
                continue;
            };
            let Some(record) = entry.versions.get(version) else {
                continue;
            };
            if let Some(target) = self.selector.target_for(&entry.specifier, record) {
                result.insert(build_upgrade(entry, target));
            }
        }
        Ok(())
    }
}

/// Keep one declaration per package name, preferring the most specific section
///
/// A warning is recorded when the dropped declaration used a different specifier.
fn dedupe(declarations: &[Declaration], result: &mut ResolutionResult) -> Vec<Declaration> {
    let mut kept: IndexMap<&str, &Declaration> = IndexMap::new();

    for declaration in declarations {
        match kept.get(declaration.name.as_str()).copied() {
            None => {
                kept.insert(&declaration.name, declaration);
            }
            Some(existing) => {
                let (winner, loser) = if declaration.section.priority() < existing.section.priority() {
                    (declaration, existing)
                } else {
                    (existing, declaration)
                };
                if winner.specifier != loser.specifier {
                    let message = format!(
                        "declared as {} in {} and {} in {}; using {}",
                        winner.specifier,
                        winner.section,
                        loser.specifier,
                        loser.section,
                        winner.section
                    );
                    warn!(package = %declaration.name, "{}", message);
                    result.warn(declaration.name.as_str(), IssueKind::DuplicateDeclaration, message);
                }
                kept.insert(&declaration.name, winner);
            }
        }
    }

    kept.into_values().cloned().collect()
}

fn invalid_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("package name is empty")
    } else if name.chars().any(char::is_control) {
        Some("package name contains control characters")
    } else {
        None
    }
}

fn build_upgrade(entry: &Fetched, target: Target<'_>) -> Upgrade {
    let new_version = &target.record.version;
    let old_version = entry
        .specifier
        .base
        .clone()
        .or_else(|| entry.versions.installed.clone())
        .unwrap_or_else(|| Version::new(0, 0, 0));

    Upgrade {
        name: entry.declaration.name.clone(),
        section: entry.declaration.section,
        from: entry.declaration.specifier.clone(),
        to: target.specifier,
        version: new_version.to_string(),
        distance: Distance::between(&old_version, new_version),
        published_at: target.record.published_at,
        repository: target.record.repository.clone(),
    }
}
